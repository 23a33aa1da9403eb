use anyhow::Result;
use serde::Serialize;

use crate::app::languages::LanguageService;
use crate::domain::language::Locale;
use crate::infra::db::is_missing_relation;

/// Read-only view of the active-language set used during resolution.
#[axum::async_trait]
pub trait ActiveLanguages: Send + Sync {
    async fn is_active(&self, code: &str) -> Result<bool>;
    /// Code of the language flagged both default and active.
    async fn default_code(&self) -> Result<Option<String>>;
}

#[axum::async_trait]
impl ActiveLanguages for LanguageService {
    async fn is_active(&self, code: &str) -> Result<bool> {
        Ok(self.find_active(code).await?.is_some())
    }

    async fn default_code(&self) -> Result<Option<String>> {
        Ok(self.default_language().await?.map(|language| language.code))
    }
}

/// Raw locale signals carried by one request.
#[derive(Debug, Clone, Default)]
pub struct LocaleSignals {
    pub session: Option<String>,
    pub cookie: Option<String>,
    pub accept_language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocaleSource {
    Session,
    Cookie,
    Header,
    StoredDefault,
    ConfigDefault,
}

impl LocaleSource {
    /// Request signals in precedence order; the defaults are not listed here
    /// because they are never validated against the active set.
    pub const PRECEDENCE: [LocaleSource; 3] =
        [LocaleSource::Session, LocaleSource::Cookie, LocaleSource::Header];

    fn candidates(&self, signals: &LocaleSignals) -> Vec<String> {
        match self {
            Self::Session => signals.session.iter().cloned().collect(),
            Self::Cookie => signals.cookie.iter().cloned().collect(),
            Self::Header => signals
                .accept_language
                .as_deref()
                .map(parse_accept_language)
                .unwrap_or_default(),
            Self::StoredDefault | Self::ConfigDefault => Vec::new(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Session => "session",
            Self::Cookie => "cookie",
            Self::Header => "header",
            Self::StoredDefault => "stored_default",
            Self::ConfigDefault => "config_default",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedLocale {
    pub locale: Locale,
    pub source: LocaleSource,
}

#[derive(Clone)]
pub struct LocaleResolver<L> {
    languages: L,
    fallback: Locale,
}

impl<L: ActiveLanguages> LocaleResolver<L> {
    pub fn new(languages: L, fallback: Locale) -> Self {
        Self {
            languages,
            fallback,
        }
    }

    /// Picks the locale for a request. Never fails: lookup errors count as
    /// "no match" and the chain ends at the configured fallback.
    pub async fn resolve(&self, signals: &LocaleSignals) -> ResolvedLocale {
        for source in LocaleSource::PRECEDENCE {
            for candidate in source.candidates(signals) {
                if let Some(locale) = self.validate(&candidate).await {
                    return ResolvedLocale { locale, source };
                }
            }
        }

        self.default_locale().await
    }

    /// Validates a code for an explicit language switch. `None` means the
    /// language is unknown or inactive.
    pub async fn switch_locale(&self, code: &str) -> Option<Locale> {
        self.validate(code).await
    }

    pub async fn default_locale(&self) -> ResolvedLocale {
        match self.languages.default_code().await {
            Ok(Some(code)) => {
                if let Some(locale) = Locale::parse(&code) {
                    return ResolvedLocale {
                        locale,
                        source: LocaleSource::StoredDefault,
                    };
                }
                tracing::warn!(code = %code, "stored default language has an invalid code");
            }
            Ok(None) => {}
            Err(err) => {
                log_lookup_failure(&err, "default language lookup failed");
            }
        }

        ResolvedLocale {
            locale: self.fallback.clone(),
            source: LocaleSource::ConfigDefault,
        }
    }

    async fn validate(&self, candidate: &str) -> Option<Locale> {
        let locale = Locale::parse(candidate)?;
        match self.languages.is_active(locale.as_str()).await {
            Ok(true) => Some(locale),
            Ok(false) => None,
            Err(err) => {
                log_lookup_failure(&err, "language lookup failed");
                None
            }
        }
    }
}

// Before migrations have run the languages table does not exist yet.
fn log_lookup_failure(err: &anyhow::Error, message: &'static str) {
    if is_missing_relation(err) {
        tracing::debug!(error = ?err, "{}", message);
    } else {
        tracing::warn!(error = ?err, "{}", message);
    }
}

/// Primary language subtags from an `Accept-Language` value, highest quality
/// first. Entries without `q` weigh 1.0; `q=0` and wildcards are dropped.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut weighted: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            let quality = parts
                .filter_map(|param| param.trim().strip_prefix("q="))
                .next()
                .map(|q| {
                    q.trim()
                        .parse::<f32>()
                        .ok()
                        .filter(|q| q.is_finite())
                        .map(|q| q.min(1.0))
                        .unwrap_or(0.0)
                })
                .unwrap_or(1.0);

            let primary = tag.split(['-', '_']).next()?.trim();
            if primary.len() != 2 || !primary.bytes().all(|b| b.is_ascii_alphabetic()) {
                return None;
            }
            if quality <= 0.0 {
                return None;
            }
            Some((primary.to_ascii_lowercase(), quality))
        })
        .collect();

    // Stable, so equal weights keep header order.
    weighted.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut codes: Vec<String> = Vec::with_capacity(weighted.len());
    for (code, _) in weighted {
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes
}
