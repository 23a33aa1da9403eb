use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;
use url::Url;

use crate::domain::language::Locale;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub redis_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub admin_token: Option<String>,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    /// Used when no default language is stored, even if that code is not active.
    pub default_locale: Locale,
    pub locale_cookie_max_age_days: i64,
    pub session_ttl_seconds: u64,
    pub language_cache_ttl_seconds: u64,
    pub public_base_url: Url,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let default_locale = parse_default_locale(&env_or("DEFAULT_LOCALE", "es"))?;

        let public_base_url = Url::parse(&env_or("PUBLIC_BASE_URL", "http://localhost:8080"))
            .map_err(|err| anyhow!("invalid PUBLIC_BASE_URL: {}", err))?;

        Ok(Self {
            http_addr,
            database_url: env_or_err("DATABASE_URL")?,
            redis_url: env_or("REDIS_URL", "redis://127.0.0.1/"),
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            admin_token: std::env::var("ADMIN_TOKEN").ok(),
            paseto_access_key: env_key_32("PASETO_ACCESS_KEY")?,
            access_ttl_minutes: env_or_parse("ACCESS_TTL_MINUTES", "60")?,
            default_locale,
            locale_cookie_max_age_days: env_or_parse("LOCALE_COOKIE_MAX_AGE_DAYS", "365")?,
            session_ttl_seconds: env_or_parse("SESSION_TTL_SECONDS", "7200")?,
            language_cache_ttl_seconds: env_or_parse("LANGUAGE_CACHE_TTL_SECONDS", "300")?,
            public_base_url,
        })
    }
}

fn parse_default_locale(value: &str) -> Result<Locale> {
    Locale::parse(value)
        .ok_or_else(|| anyhow!("invalid DEFAULT_LOCALE: expected a 2-letter code, got {:?}", value))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_key_32(key: &str) -> Result<[u8; 32]> {
    let value = env_or_err(key)?;
    let decoded = STANDARD
        .decode(value.as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    if decoded.len() != 32 {
        return Err(anyhow!("invalid {}: expected 32 bytes", key));
    }
    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&decoded);
    Ok(key_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_locale_is_normalised_once() {
        assert_eq!(parse_default_locale(" ES ").expect("valid code").as_str(), "es");
        assert!(parse_default_locale("esp").is_err());
        assert!(parse_default_locale("e1").is_err());
        assert!(parse_default_locale("").is_err());
    }
}
