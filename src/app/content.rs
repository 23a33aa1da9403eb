use anyhow::{anyhow, Result};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{Postgres, Row, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::publish::PublishNotifier;
use crate::domain::content::{slugify, Call, CallStatus, Document, NewsPost, Program, Resolution};
use crate::domain::publish::PublishState;
use crate::infra::db::Db;

/// An entity written by the admin surface plus the fan-out it caused.
#[derive(Debug, Clone, Serialize)]
pub struct Saved<T> {
    pub item: T,
    pub notifications_sent: u64,
}

/// `None` leaves the timestamp unchanged; `Some(None)` clears it.
pub type PublishedAtChange = Option<Option<OffsetDateTime>>;

pub struct NewCall {
    pub program_id: Uuid,
    pub title: String,
    pub status: CallStatus,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Default)]
pub struct CallChanges {
    pub title: Option<String>,
    pub status: Option<CallStatus>,
    pub published_at: PublishedAtChange,
}

pub struct NewResolution {
    pub call_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Default)]
pub struct ResolutionChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: PublishedAtChange,
}

pub struct NewNewsPost {
    pub title: String,
    pub excerpt: Option<String>,
    pub published_at: Option<OffsetDateTime>,
}

#[derive(Default)]
pub struct NewsPostChanges {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub published_at: PublishedAtChange,
}

pub struct NewDocument {
    pub title: String,
    pub description: Option<String>,
    pub is_active: bool,
}

#[derive(Default)]
pub struct DocumentChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Admin write path for programs and the four publishable kinds. Every write
/// that can publish hands the before/after state to the notifier inside the
/// same transaction.
#[derive(Clone)]
pub struct ContentService {
    db: Db,
    notifier: PublishNotifier,
}

impl ContentService {
    pub fn new(db: Db, notifier: PublishNotifier) -> Self {
        Self { db, notifier }
    }

    pub async fn create_program(&self, code: &str, name: &str) -> Result<Program> {
        let row = sqlx::query(
            "INSERT INTO programs (code, name) VALUES ($1, $2) \
             RETURNING id, code, name, created_at",
        )
        .bind(code)
        .bind(name)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Program {
            id: row.get("id"),
            code: row.get("code"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        })
    }

    /// `None` when the program does not exist.
    pub async fn create_call(&self, new: NewCall) -> Result<Option<Saved<Call>>> {
        let mut tx = self.db.pool().begin().await?;

        let program_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM programs WHERE id = $1)")
                .bind(new.program_id)
                .fetch_one(&mut *tx)
                .await?;
        if !program_exists {
            tx.rollback().await?;
            return Ok(None);
        }

        let slug = unique_slug(&mut tx, "calls", &new.title).await?;
        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO calls (program_id, title, slug, status, published_at) \
                VALUES ($1, $2, $3, $4, $5) \
                RETURNING id, program_id, title, slug, status, published_at, created_at \
             ) \
             SELECT c.*, p.name AS program_name \
             FROM inserted c JOIN programs p ON p.id = c.program_id",
        )
        .bind(new.program_id)
        .bind(&new.title)
        .bind(&slug)
        .bind(new.status.as_db())
        .bind(new.published_at)
        .fetch_one(&mut *tx)
        .await?;
        let call = call_from_row(&row)?;

        let notifications_sent = self.notifier.entity_created(&call, &mut tx).await?;
        tx.commit().await?;

        Ok(Some(Saved {
            item: call,
            notifications_sent,
        }))
    }

    pub async fn update_call(&self, call_id: Uuid, changes: CallChanges) -> Result<Option<Saved<Call>>> {
        let mut tx = self.db.pool().begin().await?;

        let previous: Option<Option<OffsetDateTime>> =
            sqlx::query_scalar("SELECT published_at FROM calls WHERE id = $1 FOR UPDATE")
                .bind(call_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };
        let published_at = changes.published_at.unwrap_or(previous);

        let row = sqlx::query(
            "WITH updated AS ( \
                UPDATE calls \
                SET title = COALESCE($2, title), \
                    status = COALESCE($3, status), \
                    published_at = $4 \
                WHERE id = $1 \
                RETURNING id, program_id, title, slug, status, published_at, created_at \
             ) \
             SELECT c.*, p.name AS program_name \
             FROM updated c JOIN programs p ON p.id = c.program_id",
        )
        .bind(call_id)
        .bind(changes.title)
        .bind(changes.status.map(|status| status.as_db()))
        .bind(published_at)
        .fetch_one(&mut *tx)
        .await?;
        let call = call_from_row(&row)?;

        let notifications_sent = self
            .notifier
            .entity_updated(&PublishState::At(previous), &call, &mut tx)
            .await?;
        tx.commit().await?;

        Ok(Some(Saved {
            item: call,
            notifications_sent,
        }))
    }

    /// `None` when the parent call does not exist.
    pub async fn create_resolution(&self, new: NewResolution) -> Result<Option<Saved<Resolution>>> {
        let mut tx = self.db.pool().begin().await?;

        let call_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM calls WHERE id = $1)")
            .bind(new.call_id)
            .fetch_one(&mut *tx)
            .await?;
        if !call_exists {
            tx.rollback().await?;
            return Ok(None);
        }

        let row = sqlx::query(
            "WITH inserted AS ( \
                INSERT INTO resolutions (call_id, title, description, published_at) \
                VALUES ($1, $2, $3, $4) \
                RETURNING id, call_id, title, description, published_at, created_at \
             ) \
             SELECT r.*, c.title AS call_title \
             FROM inserted r JOIN calls c ON c.id = r.call_id",
        )
        .bind(new.call_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.published_at)
        .fetch_one(&mut *tx)
        .await?;
        let resolution = resolution_from_row(&row);

        let notifications_sent = self.notifier.entity_created(&resolution, &mut tx).await?;
        tx.commit().await?;

        Ok(Some(Saved {
            item: resolution,
            notifications_sent,
        }))
    }

    pub async fn update_resolution(
        &self,
        resolution_id: Uuid,
        changes: ResolutionChanges,
    ) -> Result<Option<Saved<Resolution>>> {
        let mut tx = self.db.pool().begin().await?;

        let previous: Option<Option<OffsetDateTime>> =
            sqlx::query_scalar("SELECT published_at FROM resolutions WHERE id = $1 FOR UPDATE")
                .bind(resolution_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };
        let published_at = changes.published_at.unwrap_or(previous);

        let row = sqlx::query(
            "WITH updated AS ( \
                UPDATE resolutions \
                SET title = COALESCE($2, title), \
                    description = COALESCE($3, description), \
                    published_at = $4 \
                WHERE id = $1 \
                RETURNING id, call_id, title, description, published_at, created_at \
             ) \
             SELECT r.*, c.title AS call_title \
             FROM updated r JOIN calls c ON c.id = r.call_id",
        )
        .bind(resolution_id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(published_at)
        .fetch_one(&mut *tx)
        .await?;
        let resolution = resolution_from_row(&row);

        let notifications_sent = self
            .notifier
            .entity_updated(&PublishState::At(previous), &resolution, &mut tx)
            .await?;
        tx.commit().await?;

        Ok(Some(Saved {
            item: resolution,
            notifications_sent,
        }))
    }

    pub async fn create_news_post(&self, new: NewNewsPost) -> Result<Saved<NewsPost>> {
        let mut tx = self.db.pool().begin().await?;

        let slug = unique_slug(&mut tx, "news_posts", &new.title).await?;
        let row = sqlx::query(
            "INSERT INTO news_posts (title, slug, excerpt, published_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, title, slug, excerpt, published_at, created_at",
        )
        .bind(&new.title)
        .bind(&slug)
        .bind(&new.excerpt)
        .bind(new.published_at)
        .fetch_one(&mut *tx)
        .await?;
        let post = news_post_from_row(&row);

        let notifications_sent = self.notifier.entity_created(&post, &mut tx).await?;
        tx.commit().await?;

        Ok(Saved {
            item: post,
            notifications_sent,
        })
    }

    pub async fn update_news_post(
        &self,
        post_id: Uuid,
        changes: NewsPostChanges,
    ) -> Result<Option<Saved<NewsPost>>> {
        let mut tx = self.db.pool().begin().await?;

        let previous: Option<Option<OffsetDateTime>> =
            sqlx::query_scalar("SELECT published_at FROM news_posts WHERE id = $1 FOR UPDATE")
                .bind(post_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };
        let published_at = changes.published_at.unwrap_or(previous);

        let row = sqlx::query(
            "UPDATE news_posts \
             SET title = COALESCE($2, title), \
                 excerpt = COALESCE($3, excerpt), \
                 published_at = $4 \
             WHERE id = $1 \
             RETURNING id, title, slug, excerpt, published_at, created_at",
        )
        .bind(post_id)
        .bind(changes.title)
        .bind(changes.excerpt)
        .bind(published_at)
        .fetch_one(&mut *tx)
        .await?;
        let post = news_post_from_row(&row);

        let notifications_sent = self
            .notifier
            .entity_updated(&PublishState::At(previous), &post, &mut tx)
            .await?;
        tx.commit().await?;

        Ok(Some(Saved {
            item: post,
            notifications_sent,
        }))
    }

    pub async fn create_document(&self, new: NewDocument) -> Result<Saved<Document>> {
        let mut tx = self.db.pool().begin().await?;

        let slug = unique_slug(&mut tx, "documents", &new.title).await?;
        let row = sqlx::query(
            "INSERT INTO documents (title, slug, description, is_active) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, title, slug, description, is_active, created_at",
        )
        .bind(&new.title)
        .bind(&slug)
        .bind(&new.description)
        .bind(new.is_active)
        .fetch_one(&mut *tx)
        .await?;
        let document = document_from_row(&row);

        let notifications_sent = self.notifier.entity_created(&document, &mut tx).await?;
        tx.commit().await?;

        Ok(Saved {
            item: document,
            notifications_sent,
        })
    }

    pub async fn update_document(
        &self,
        document_id: Uuid,
        changes: DocumentChanges,
    ) -> Result<Option<Saved<Document>>> {
        let mut tx = self.db.pool().begin().await?;

        let previous: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM documents WHERE id = $1 FOR UPDATE")
                .bind(document_id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(previous) = previous else {
            tx.rollback().await?;
            return Ok(None);
        };

        let row = sqlx::query(
            "UPDATE documents \
             SET title = COALESCE($2, title), \
                 description = COALESCE($3, description), \
                 is_active = COALESCE($4, is_active) \
             WHERE id = $1 \
             RETURNING id, title, slug, description, is_active, created_at",
        )
        .bind(document_id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.is_active)
        .fetch_one(&mut *tx)
        .await?;
        let document = document_from_row(&row);

        let notifications_sent = self
            .notifier
            .entity_updated(&PublishState::Flag(previous), &document, &mut tx)
            .await?;
        tx.commit().await?;

        Ok(Some(Saved {
            item: document,
            notifications_sent,
        }))
    }
}

/// Slug derived from the title, suffixed `-2`, `-3`, ... until free in `table`.
async fn unique_slug(tx: &mut Transaction<'_, Postgres>, table: &str, title: &str) -> Result<String> {
    let base = slugify(title);
    let query = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE slug = $1)", table);

    let mut candidate = base.clone();
    let mut suffix = 2;
    loop {
        let taken: bool = sqlx::query_scalar(&query)
            .bind(&candidate)
            .fetch_one(&mut **tx)
            .await?;
        if !taken {
            return Ok(candidate);
        }
        candidate = format!("{}-{}", base, suffix);
        suffix += 1;
    }
}

fn call_from_row(row: &PgRow) -> Result<Call> {
    let status: String = row.get("status");
    let status =
        CallStatus::from_db(&status).ok_or_else(|| anyhow!("unknown call status: {}", status))?;

    Ok(Call {
        id: row.get("id"),
        program_id: row.get("program_id"),
        program_name: row.get("program_name"),
        title: row.get("title"),
        slug: row.get("slug"),
        status,
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
    })
}

fn resolution_from_row(row: &PgRow) -> Resolution {
    Resolution {
        id: row.get("id"),
        call_id: row.get("call_id"),
        call_title: row.get("call_title"),
        title: row.get("title"),
        description: row.get("description"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
    }
}

fn news_post_from_row(row: &PgRow) -> NewsPost {
    NewsPost {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        excerpt: row.get("excerpt"),
        published_at: row.get("published_at"),
        created_at: row.get("created_at"),
    }
}

fn document_from_row(row: &PgRow) -> Document {
    Document {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
    }
}
