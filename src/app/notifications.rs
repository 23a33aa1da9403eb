use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::notification::{NewNotification, Notification, NotificationType};
use crate::infra::db::Db;

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, notification_type, title, message, link, is_read, read_at, created_at";

#[derive(Clone)]
pub struct NotificationService {
    db: Db,
}

impl NotificationService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        cursor: Option<(OffsetDateTime, Uuid)>,
        unread_only: bool,
        limit: i64,
    ) -> Result<Vec<Notification>> {
        let rows = match cursor {
            Some((created_at, notification_id)) => {
                sqlx::query(&format!(
                    "SELECT {NOTIFICATION_COLUMNS} \
                     FROM notifications \
                     WHERE user_id = $1 \
                       AND ($2 = false OR is_read = false) \
                       AND (created_at < $3 OR (created_at = $3 AND id < $4)) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $5"
                ))
                .bind(user_id)
                .bind(unread_only)
                .bind(created_at)
                .bind(notification_id)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {NOTIFICATION_COLUMNS} \
                     FROM notifications \
                     WHERE user_id = $1 \
                       AND ($2 = false OR is_read = false) \
                     ORDER BY created_at DESC, id DESC \
                     LIMIT $3"
                ))
                .bind(user_id)
                .bind(unread_only)
                .bind(limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        rows.iter().map(notification_from_row).collect()
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(count)
    }

    /// Marks one notification read. Re-marking keeps the original `read_at`.
    /// Returns `None` when the notification does not belong to the user.
    pub async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> Result<Option<Notification>> {
        let row = sqlx::query(&format!(
            "UPDATE notifications \
             SET is_read = true, read_at = COALESCE(read_at, now()) \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(notification_from_row).transpose()
    }

    /// Every unread notification of the user gets the same `read_at`:
    /// `now()` is fixed for the statement, the same clock `mark_read` uses.
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications \
             SET is_read = true, read_at = COALESCE(read_at, now()) \
             WHERE user_id = $1 AND is_read = false",
        )
        .bind(user_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, notification_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(notification_id)
            .bind(user_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Inserts one row per recipient in a single transaction; either every
    /// recipient gets the notification or none does.
    pub async fn create_for_users(
        &self,
        user_ids: &[Uuid],
        notification: &NewNotification,
    ) -> Result<u64> {
        let mut tx = self.db.pool().begin().await?;
        let created = self
            .create_for_users_with_tx(user_ids, notification, &mut tx)
            .await?;
        tx.commit().await?;
        Ok(created)
    }

    pub async fn create_for_users_with_tx(
        &self,
        user_ids: &[Uuid],
        notification: &NewNotification,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<u64> {
        if user_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            "INSERT INTO notifications (user_id, notification_type, title, message, link) \
             SELECT recipient, $2, $3, $4, $5 FROM UNNEST($1::uuid[]) AS recipient",
        )
        .bind(user_ids)
        .bind(notification.notification_type.as_db())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.link)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}

fn notification_from_row(row: &PgRow) -> Result<Notification> {
    let notification_type: String = row.get("notification_type");
    let notification_type = NotificationType::from_db(&notification_type)
        .ok_or_else(|| anyhow!("unknown notification type: {}", notification_type))?;

    Ok(Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        notification_type,
        title: row.get("title"),
        message: row.get("message"),
        link: row.get("link"),
        is_read: row.get("is_read"),
        read_at: row.get("read_at"),
        created_at: row.get("created_at"),
    })
}
