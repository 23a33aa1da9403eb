pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use url::Url;

use crate::app::auth::AuthService;
use crate::app::content::ContentService;
use crate::app::languages::LanguageService;
use crate::app::locale::LocaleResolver;
use crate::app::publish::PublishNotifier;
use crate::app::sessions::SessionStore;
use crate::config::AppConfig;
use crate::domain::language::Locale;
use crate::infra::{cache::RedisCache, db::Db};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub cache: RedisCache,
    pub admin_token: Option<String>,
    pub paseto_access_key: [u8; 32],
    pub access_ttl_minutes: u64,
    pub default_locale: Locale,
    pub locale_cookie_max_age_days: i64,
    pub session_ttl_seconds: u64,
    pub language_cache_ttl_seconds: u64,
    pub public_base_url: Url,
}

impl AppState {
    pub fn new(config: &AppConfig, db: Db, cache: RedisCache) -> Self {
        Self {
            db,
            cache,
            admin_token: config.admin_token.clone(),
            paseto_access_key: config.paseto_access_key,
            access_ttl_minutes: config.access_ttl_minutes,
            default_locale: config.default_locale.clone(),
            locale_cookie_max_age_days: config.locale_cookie_max_age_days,
            session_ttl_seconds: config.session_ttl_seconds,
            language_cache_ttl_seconds: config.language_cache_ttl_seconds,
            public_base_url: config.public_base_url.clone(),
        }
    }

    pub fn languages(&self) -> LanguageService {
        LanguageService::new(
            self.db.clone(),
            self.cache.clone(),
            self.language_cache_ttl_seconds,
        )
    }

    pub fn locale_resolver(&self) -> LocaleResolver<LanguageService> {
        LocaleResolver::new(self.languages(), self.default_locale.clone())
    }

    pub fn sessions(&self) -> SessionStore {
        SessionStore::new(self.cache.clone(), self.session_ttl_seconds)
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.paseto_access_key, self.access_ttl_minutes)
    }

    pub fn content(&self) -> ContentService {
        let notifier = PublishNotifier::new(self.db.clone(), self.public_base_url.clone());
        ContentService::new(self.db.clone(), notifier)
    }
}
