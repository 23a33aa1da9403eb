use anyhow::Result;
use redis::{AsyncCommands, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Clone)]
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url)?;
        let mut conn = client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(Self { client })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(())
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(key).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(key, raw, ttl_seconds).await?;
        Ok(())
    }

    /// Current value of an `INCR` counter; a missing key reads as 0.
    pub async fn get_counter(&self, key: &str) -> Result<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: Option<i64> = conn.get(key).await?;
        Ok(value.unwrap_or(0))
    }

    pub async fn bump_counter(&self, key: &str) -> Result<i64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }
}
