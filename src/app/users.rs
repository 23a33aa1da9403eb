use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::User;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct UserService {
    db: Db,
}

impl UserService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, created_at \
             FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(self.db.pool())
        .await?;

        let user = row.map(|row| User {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            created_at: row.get("created_at"),
        });

        Ok(user)
    }

    /// Every user that has not been deleted; there is no preference filter.
    pub async fn active_user_ids(&self) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE deleted_at IS NULL ORDER BY created_at")
                .fetch_all(self.db.pool())
                .await?;

        Ok(ids)
    }

    pub async fn active_user_ids_with_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT id FROM users WHERE deleted_at IS NULL ORDER BY created_at")
                .fetch_all(&mut **tx)
                .await?;

        Ok(ids)
    }
}
