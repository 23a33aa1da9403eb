use anyhow::Result;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use url::Url;

use crate::app::notifications::NotificationService;
use crate::app::users::UserService;
use crate::domain::publish::{PublishState, Publishable};
use crate::infra::db::Db;

/// Fans out one notification per active user when content becomes visible.
///
/// Runs inside the transaction that wrote the entity, so a failed fan-out
/// rolls back the publish as well.
#[derive(Clone)]
pub struct PublishNotifier {
    users: UserService,
    notifications: NotificationService,
    base_url: Url,
}

impl PublishNotifier {
    pub fn new(db: Db, base_url: Url) -> Self {
        Self {
            users: UserService::new(db.clone()),
            notifications: NotificationService::new(db),
            base_url,
        }
    }

    /// Returns the number of notifications written.
    pub async fn entity_created<E: Publishable>(
        &self,
        entity: &E,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<u64> {
        let now = OffsetDateTime::now_utc();
        if !entity.publish_state().should_notify_on_create(now) {
            return Ok(0);
        }
        self.fan_out(entity, tx).await
    }

    /// `previous` is the publish state as it was before the write.
    pub async fn entity_updated<E: Publishable>(
        &self,
        previous: &PublishState,
        entity: &E,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<u64> {
        let now = OffsetDateTime::now_utc();
        if !entity.publish_state().should_notify_on_update(previous, now) {
            return Ok(0);
        }
        self.fan_out(entity, tx).await
    }

    // No dedup against earlier sends for the same entity: a replayed
    // transition notifies again.
    pub async fn fan_out<E: Publishable>(
        &self,
        entity: &E,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<u64> {
        let recipients = self.users.active_user_ids_with_tx(tx).await?;
        if recipients.is_empty() {
            tracing::debug!(kind = entity.kind(), "no users to notify");
            return Ok(0);
        }

        let notification = entity.to_notification(&self.base_url);
        let sent = self
            .notifications
            .create_for_users_with_tx(&recipients, &notification, tx)
            .await
            .map_err(|err| {
                tracing::error!(
                    error = ?err,
                    kind = entity.kind(),
                    recipients = recipients.len(),
                    "failed to fan out publish notification"
                );
                err
            })?;

        tracing::info!(
            kind = entity.kind(),
            notification_type = notification.notification_type.as_db(),
            sent,
            "publish notification sent"
        );
        Ok(sent)
    }
}
