use axum::{
    extract::{Path, Query, State},
    http::header::CONTENT_LANGUAGE,
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::content::{
    CallChanges, DocumentChanges, NewCall, NewDocument, NewNewsPost, NewResolution,
    NewsPostChanges, PublishedAtChange, ResolutionChanges, Saved,
};
use crate::app::locale::LocaleSource;
use crate::app::notifications::NotificationService;
use crate::app::sessions::{SessionStore, LOCALE_KEY, SESSION_COOKIE};
use crate::app::users::UserService;
use crate::domain::content::{Call, CallStatus, Document, NewsPost, Program, Resolution};
use crate::domain::language::{Language, Locale};
use crate::domain::notification::{NewNotification, Notification, NotificationType};
use crate::http::locale::{session_id, RequestLocale, LOCALE_COOKIE};
use crate::http::{AdminToken, AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct NotificationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    #[serde(default)]
    pub unread: bool,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let (timestamp, id) = cursor
        .split_once('/')
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn require_title(title: &str) -> Result<(), AppError> {
    const MAX_TITLE_LEN: usize = 255;

    if title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::bad_request("title must be at most 255 characters"));
    }
    Ok(())
}

fn published_at_change(
    published_at: Option<OffsetDateTime>,
    unpublish: bool,
) -> Result<PublishedAtChange, AppError> {
    match (published_at, unpublish) {
        (Some(_), true) => Err(AppError::bad_request(
            "published_at and unpublish are mutually exclusive",
        )),
        (_, true) => Ok(Some(None)),
        (Some(at), false) => Ok(Some(Some(at))),
        (None, false) => Ok(None),
    }
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db = state.db.ping().await.is_ok();
    let redis = state.cache.ping().await.is_ok();
    let status = if db && redis { "ok" } else { "degraded" };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Languages and locale
// ---------------------------------------------------------------------------

pub async fn list_languages(State(state): State<AppState>) -> Result<Json<Vec<Language>>, AppError> {
    let languages = state.languages().list_active().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list active languages");
        AppError::internal("failed to list languages")
    })?;

    Ok(Json(languages))
}

#[derive(Serialize)]
pub struct LocaleResponse {
    pub locale: Locale,
    pub source: LocaleSource,
}

pub async fn current_locale(RequestLocale(resolved): RequestLocale) -> Json<LocaleResponse> {
    Json(LocaleResponse {
        locale: resolved.locale,
        source: resolved.source,
    })
}

#[derive(Deserialize)]
pub struct SwitchLocaleRequest {
    pub code: String,
}

/// Explicit language switch: stores the code in the session and in a
/// long-lived `locale` cookie.
pub async fn switch_locale(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SwitchLocaleRequest>,
) -> Result<(CookieJar, [(axum::http::HeaderName, String); 1], Json<LocaleResponse>), AppError> {
    let locale = state
        .locale_resolver()
        .switch_locale(&payload.code)
        .await
        .ok_or_else(|| AppError::unprocessable("language not available"))?;

    let (session_id, jar) = match session_id(&jar) {
        Some(session_id) => (session_id, jar),
        None => {
            let session_id = SessionStore::new_session_id();
            let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (session_id, jar.add(cookie))
        }
    };

    // The cookie still carries the choice if the session write fails.
    if let Err(err) = state
        .sessions()
        .set(session_id, LOCALE_KEY, locale.as_str())
        .await
    {
        tracing::warn!(error = ?err, locale = %locale, "failed to store session locale");
    }

    let locale_cookie = Cookie::build((LOCALE_COOKIE, locale.to_string()))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(state.locale_cookie_max_age_days))
        .build();
    let jar = jar.add(locale_cookie);

    tracing::info!(locale = %locale, "locale switched");
    Ok((
        jar,
        [(CONTENT_LANGUAGE, locale.to_string())],
        Json(LocaleResponse {
            locale,
            source: LocaleSource::Session,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<ListResponse<Notification>>, AppError> {
    let limit = query.limit.unwrap_or(30);
    if !(1..=200).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 200"));
    }
    let cursor = parse_cursor(query.cursor)?;

    let service = NotificationService::new(state.db.clone());
    let mut notifications = service
        .list(auth.user_id, cursor, query.unread, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to list notifications");
            AppError::internal("failed to list notifications")
        })?;

    let next_cursor = if notifications.len() > limit as usize {
        notifications.truncate(limit as usize);
        notifications.last().map(|last| (last.created_at, last.id))
    } else {
        None
    };

    Ok(Json(ListResponse {
        items: notifications,
        next_cursor: encode_cursor(next_cursor),
    }))
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

pub async fn unread_notification_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UnreadCountResponse>, AppError> {
    let service = NotificationService::new(state.db.clone());
    let count = service.unread_count(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to count unread notifications");
        AppError::internal("failed to count unread notifications")
    })?;

    Ok(Json(UnreadCountResponse { count }))
}

pub async fn mark_notification_read(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Notification>, AppError> {
    let service = NotificationService::new(state.db.clone());
    let notification = service
        .mark_read(id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, notification_id = %id, user_id = %auth.user_id, "failed to mark notification read");
            AppError::internal("failed to mark notification read")
        })?;

    notification
        .map(Json)
        .ok_or_else(|| AppError::not_found("notification not found"))
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub async fn mark_all_notifications_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let service = NotificationService::new(state.db.clone());
    let updated = service.mark_all_read(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to mark all notifications read");
        AppError::internal("failed to mark notifications read")
    })?;

    Ok(Json(MarkAllReadResponse { updated }))
}

pub async fn delete_notification(
    auth: AuthUser,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = NotificationService::new(state.db.clone());
    let deleted = service.delete(id, auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, notification_id = %id, user_id = %auth.user_id, "failed to delete notification");
        AppError::internal("failed to delete notification")
    })?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("notification not found"))
    }
}

// ---------------------------------------------------------------------------
// Admin: languages
// ---------------------------------------------------------------------------

pub async fn admin_list_languages(
    _admin: AdminToken,
    State(state): State<AppState>,
) -> Result<Json<Vec<Language>>, AppError> {
    let languages = state.languages().list_all().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list languages");
        AppError::internal("failed to list languages")
    })?;

    Ok(Json(languages))
}

#[derive(Deserialize)]
pub struct CreateLanguageRequest {
    pub code: String,
    pub name: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_default: bool,
}

fn default_true() -> bool {
    true
}

pub async fn admin_create_language(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CreateLanguageRequest>,
) -> Result<Json<Language>, AppError> {
    if Locale::parse(&payload.code).is_none() {
        return Err(AppError::bad_request("code must be a 2-letter language code"));
    }
    if payload.name.trim().is_empty() {
        return Err(AppError::bad_request("name is required"));
    }

    let service = state.languages();
    let existing = service.list_all().await.map_err(|err| {
        tracing::error!(error = ?err, "failed to list languages");
        AppError::internal("failed to create language")
    })?;
    let code = payload.code.trim().to_ascii_lowercase();
    if existing.iter().any(|language| language.code == code) {
        return Err(AppError::conflict("language already exists"));
    }

    let language = service
        .create(&code, payload.name.trim(), payload.is_active, payload.is_default)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, code = %code, "failed to create language");
            AppError::internal("failed to create language")
        })?;

    Ok(Json(language))
}

#[derive(Deserialize)]
pub struct UpdateLanguageRequest {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub is_default: Option<bool>,
}

pub async fn admin_update_language(
    _admin: AdminToken,
    Path(code): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateLanguageRequest>,
) -> Result<Json<Language>, AppError> {
    if payload.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
        return Err(AppError::bad_request("name must not be empty"));
    }

    let language = state
        .languages()
        .update(&code, payload.name, payload.is_active, payload.is_default)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, code = %code, "failed to update language");
            AppError::internal("failed to update language")
        })?;

    language
        .map(Json)
        .ok_or_else(|| AppError::not_found("language not found"))
}

// ---------------------------------------------------------------------------
// Admin: content
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateProgramRequest {
    pub code: String,
    pub name: String,
}

pub async fn admin_create_program(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CreateProgramRequest>,
) -> Result<Json<Program>, AppError> {
    if payload.code.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(AppError::bad_request("code and name are required"));
    }

    let program = state
        .content()
        .create_program(payload.code.trim(), payload.name.trim())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create program");
            AppError::internal("failed to create program")
        })?;

    Ok(Json(program))
}

#[derive(Deserialize)]
pub struct CreateCallRequest {
    pub program_id: Uuid,
    pub title: String,
    pub status: Option<CallStatus>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

pub async fn admin_create_call(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CreateCallRequest>,
) -> Result<Json<Saved<Call>>, AppError> {
    require_title(&payload.title)?;

    let saved = state
        .content()
        .create_call(NewCall {
            program_id: payload.program_id,
            title: payload.title.trim().to_string(),
            status: payload.status.unwrap_or(CallStatus::Borrador),
            published_at: payload.published_at,
        })
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, program_id = %payload.program_id, "failed to create call");
            AppError::internal("failed to create call")
        })?;

    saved
        .map(Json)
        .ok_or_else(|| AppError::bad_request("invalid program_id"))
}

#[derive(Deserialize)]
pub struct UpdateCallRequest {
    pub title: Option<String>,
    pub status: Option<CallStatus>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub unpublish: bool,
}

pub async fn admin_update_call(
    _admin: AdminToken,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateCallRequest>,
) -> Result<Json<Saved<Call>>, AppError> {
    if let Some(title) = payload.title.as_deref() {
        require_title(title)?;
    }
    let published_at = published_at_change(payload.published_at, payload.unpublish)?;

    let saved = state
        .content()
        .update_call(
            id,
            CallChanges {
                title: payload.title.map(|title| title.trim().to_string()),
                status: payload.status,
                published_at,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, call_id = %id, "failed to update call");
            AppError::internal("failed to update call")
        })?;

    saved
        .map(Json)
        .ok_or_else(|| AppError::not_found("call not found"))
}

#[derive(Deserialize)]
pub struct CreateResolutionRequest {
    pub call_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

pub async fn admin_create_resolution(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CreateResolutionRequest>,
) -> Result<Json<Saved<Resolution>>, AppError> {
    require_title(&payload.title)?;

    let saved = state
        .content()
        .create_resolution(NewResolution {
            call_id: payload.call_id,
            title: payload.title.trim().to_string(),
            description: payload.description,
            published_at: payload.published_at,
        })
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, call_id = %payload.call_id, "failed to create resolution");
            AppError::internal("failed to create resolution")
        })?;

    saved
        .map(Json)
        .ok_or_else(|| AppError::bad_request("invalid call_id"))
}

#[derive(Deserialize)]
pub struct UpdateResolutionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub unpublish: bool,
}

pub async fn admin_update_resolution(
    _admin: AdminToken,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateResolutionRequest>,
) -> Result<Json<Saved<Resolution>>, AppError> {
    if let Some(title) = payload.title.as_deref() {
        require_title(title)?;
    }
    let published_at = published_at_change(payload.published_at, payload.unpublish)?;

    let saved = state
        .content()
        .update_resolution(
            id,
            ResolutionChanges {
                title: payload.title.map(|title| title.trim().to_string()),
                description: payload.description,
                published_at,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, resolution_id = %id, "failed to update resolution");
            AppError::internal("failed to update resolution")
        })?;

    saved
        .map(Json)
        .ok_or_else(|| AppError::not_found("resolution not found"))
}

#[derive(Deserialize)]
pub struct CreateNewsPostRequest {
    pub title: String,
    pub excerpt: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
}

pub async fn admin_create_news_post(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CreateNewsPostRequest>,
) -> Result<Json<Saved<NewsPost>>, AppError> {
    require_title(&payload.title)?;

    let saved = state
        .content()
        .create_news_post(NewNewsPost {
            title: payload.title.trim().to_string(),
            excerpt: payload.excerpt,
            published_at: payload.published_at,
        })
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create news post");
            AppError::internal("failed to create news post")
        })?;

    Ok(Json(saved))
}

#[derive(Deserialize)]
pub struct UpdateNewsPostRequest {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub unpublish: bool,
}

pub async fn admin_update_news_post(
    _admin: AdminToken,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateNewsPostRequest>,
) -> Result<Json<Saved<NewsPost>>, AppError> {
    if let Some(title) = payload.title.as_deref() {
        require_title(title)?;
    }
    let published_at = published_at_change(payload.published_at, payload.unpublish)?;

    let saved = state
        .content()
        .update_news_post(
            id,
            NewsPostChanges {
                title: payload.title.map(|title| title.trim().to_string()),
                excerpt: payload.excerpt,
                published_at,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, news_post_id = %id, "failed to update news post");
            AppError::internal("failed to update news post")
        })?;

    saved
        .map(Json)
        .ok_or_else(|| AppError::not_found("news post not found"))
}

#[derive(Deserialize)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

pub async fn admin_create_document(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<CreateDocumentRequest>,
) -> Result<Json<Saved<Document>>, AppError> {
    require_title(&payload.title)?;

    let saved = state
        .content()
        .create_document(NewDocument {
            title: payload.title.trim().to_string(),
            description: payload.description,
            is_active: payload.is_active,
        })
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create document");
            AppError::internal("failed to create document")
        })?;

    Ok(Json(saved))
}

#[derive(Deserialize)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn admin_update_document(
    _admin: AdminToken,
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateDocumentRequest>,
) -> Result<Json<Saved<Document>>, AppError> {
    if let Some(title) = payload.title.as_deref() {
        require_title(title)?;
    }

    let saved = state
        .content()
        .update_document(
            id,
            DocumentChanges {
                title: payload.title.map(|title| title.trim().to_string()),
                description: payload.description,
                is_active: payload.is_active,
            },
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, document_id = %id, "failed to update document");
            AppError::internal("failed to update document")
        })?;

    saved
        .map(Json)
        .ok_or_else(|| AppError::not_found("document not found"))
}

// ---------------------------------------------------------------------------
// Admin: system notifications
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct BroadcastRequest {
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

#[derive(Serialize)]
pub struct BroadcastResponse {
    pub sent: u64,
}

pub async fn admin_broadcast_notification(
    _admin: AdminToken,
    State(state): State<AppState>,
    Json(payload): Json<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>, AppError> {
    require_title(&payload.title)?;
    if payload.message.trim().is_empty() {
        return Err(AppError::bad_request("message is required"));
    }

    let recipients = UserService::new(state.db.clone())
        .active_user_ids()
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to load broadcast recipients");
            AppError::internal("failed to send notification")
        })?;

    let notification = NewNotification {
        notification_type: NotificationType::Sistema,
        title: payload.title.trim().to_string(),
        message: payload.message.trim().to_string(),
        link: payload.link,
    };
    let sent = NotificationService::new(state.db.clone())
        .create_for_users(&recipients, &notification)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, recipients = recipients.len(), "failed to broadcast notification");
            AppError::internal("failed to send notification")
        })?;

    tracing::info!(sent, "system notification broadcast");
    Ok(Json(BroadcastResponse { sent }))
}
