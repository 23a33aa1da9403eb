use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::domain::language::{Language, Locale};
use crate::infra::cache::RedisCache;
use crate::infra::db::Db;

/// Bumped after every language write. Cached lists are keyed by the
/// generation they were read under, so a reload that raced a write lands on
/// a key nobody reads any more.
pub const LANGUAGES_GENERATION_KEY: &str = "languages:generation";

pub fn active_languages_key(generation: i64) -> String {
    format!("languages:active:{}", generation)
}

#[derive(Clone)]
pub struct LanguageService {
    db: Db,
    cache: RedisCache,
    cache_ttl_seconds: u64,
}

impl LanguageService {
    pub fn new(db: Db, cache: RedisCache, cache_ttl_seconds: u64) -> Self {
        Self {
            db,
            cache,
            cache_ttl_seconds,
        }
    }

    /// Active languages ordered by name, served from Redis when warm.
    pub async fn list_active(&self) -> Result<Vec<Language>> {
        // The generation is read before the query so a concurrent write
        // moves readers past whatever this call caches.
        let cache_key = match self.cache.get_counter(LANGUAGES_GENERATION_KEY).await {
            Ok(generation) => Some(active_languages_key(generation)),
            Err(err) => {
                tracing::warn!(error = ?err, "failed to read languages cache generation");
                None
            }
        };

        if let Some(key) = cache_key.as_deref() {
            match self.cache.get_json::<Vec<Language>>(key).await {
                Ok(Some(languages)) => return Ok(languages),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(error = ?err, "failed to read active languages from cache");
                }
            }
        }

        let rows = sqlx::query(
            "SELECT id, code, name, is_active, is_default, created_at \
             FROM languages \
             WHERE is_active = true \
             ORDER BY name ASC",
        )
        .fetch_all(self.db.pool())
        .await?;
        let languages: Vec<Language> = rows.iter().map(language_from_row).collect();

        if let Some(key) = cache_key.as_deref() {
            if let Err(err) = self
                .cache
                .set_json(key, &languages, self.cache_ttl_seconds)
                .await
            {
                tracing::warn!(error = ?err, "failed to cache active languages");
            }
        }

        Ok(languages)
    }

    pub async fn find_active(&self, code: &str) -> Result<Option<Language>> {
        let code = code.trim().to_ascii_lowercase();
        let languages = self.list_active().await?;
        Ok(languages.into_iter().find(|language| language.code == code))
    }

    /// The language flagged both default and active, if any.
    pub async fn default_language(&self) -> Result<Option<Language>> {
        let languages = self.list_active().await?;
        Ok(languages.into_iter().find(|language| language.is_default))
    }

    pub async fn list_all(&self) -> Result<Vec<Language>> {
        let rows = sqlx::query(
            "SELECT id, code, name, is_active, is_default, created_at \
             FROM languages \
             ORDER BY name ASC",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(language_from_row).collect())
    }

    pub async fn create(
        &self,
        code: &str,
        name: &str,
        is_active: bool,
        is_default: bool,
    ) -> Result<Language> {
        let code = Locale::parse(code).ok_or_else(|| anyhow!("invalid language code: {}", code))?;

        let mut tx = self.db.pool().begin().await?;
        if is_default {
            sqlx::query("UPDATE languages SET is_default = false WHERE is_default = true")
                .execute(&mut *tx)
                .await?;
        }
        let row = sqlx::query(
            "INSERT INTO languages (code, name, is_active, is_default) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, code, name, is_active, is_default, created_at",
        )
        .bind(code.as_str())
        .bind(name)
        .bind(is_active)
        .bind(is_default)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        self.invalidate().await;
        Ok(language_from_row(&row))
    }

    /// Setting `is_default` clears the flag on every other language.
    pub async fn update(
        &self,
        code: &str,
        name: Option<String>,
        is_active: Option<bool>,
        is_default: Option<bool>,
    ) -> Result<Option<Language>> {
        let code = code.trim().to_ascii_lowercase();

        let mut tx = self.db.pool().begin().await?;
        if is_default == Some(true) {
            sqlx::query("UPDATE languages SET is_default = false WHERE is_default = true AND code <> $1")
                .bind(&code)
                .execute(&mut *tx)
                .await?;
        }
        let row = sqlx::query(
            "UPDATE languages \
             SET name = COALESCE($2, name), \
                 is_active = COALESCE($3, is_active), \
                 is_default = COALESCE($4, is_default) \
             WHERE code = $1 \
             RETURNING id, code, name, is_active, is_default, created_at",
        )
        .bind(&code)
        .bind(name)
        .bind(is_active)
        .bind(is_default)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(None);
        };
        tx.commit().await?;

        self.invalidate().await;
        Ok(Some(language_from_row(&row)))
    }

    async fn invalidate(&self) {
        match self.cache.bump_counter(LANGUAGES_GENERATION_KEY).await {
            Ok(generation) => {
                tracing::debug!(generation, "active languages cache invalidated");
            }
            Err(err) => {
                tracing::warn!(error = ?err, "failed to invalidate active languages cache");
            }
        }
    }
}

fn language_from_row(row: &PgRow) -> Language {
    Language {
        id: row.get("id"),
        code: row.get("code"),
        name: row.get("name"),
        is_active: row.get("is_active"),
        is_default: row.get("is_default"),
        created_at: row.get("created_at"),
    }
}
