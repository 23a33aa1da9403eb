use anyhow::Result;
use uuid::Uuid;

use crate::infra::cache::RedisCache;

pub const SESSION_COOKIE: &str = "portal_session";
pub const LOCALE_KEY: &str = "locale";

/// Anonymous server-side session values kept in a Redis hash per session id.
#[derive(Clone)]
pub struct SessionStore {
    cache: RedisCache,
    ttl_seconds: u64,
}

impl SessionStore {
    pub fn new(cache: RedisCache, ttl_seconds: u64) -> Self {
        Self { cache, ttl_seconds }
    }

    pub fn new_session_id() -> Uuid {
        Uuid::new_v4()
    }

    /// Reads one value and slides the session expiry.
    pub async fn get(&self, session_id: Uuid, key: &str) -> Result<Option<String>> {
        let session_key = session_key(session_id);
        let mut conn = self.cache.client().get_multiplexed_async_connection().await?;
        let (value,): (Option<String>,) = redis::pipe()
            .atomic()
            .hget(&session_key, key)
            .expire(&session_key, self.ttl_seconds as i64)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    /// Writes one value and slides the session expiry.
    pub async fn set(&self, session_id: Uuid, key: &str, value: &str) -> Result<()> {
        let session_key = session_key(session_id);
        let mut conn = self.cache.client().get_multiplexed_async_connection().await?;
        redis::pipe()
            .atomic()
            .hset(&session_key, key, value)
            .ignore()
            .expire(&session_key, self.ttl_seconds as i64)
            .ignore()
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }
}

fn session_key(session_id: Uuid) -> String {
    format!("session:{}", session_id)
}
