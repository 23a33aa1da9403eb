use axum::{routing::delete, routing::get, routing::patch, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn locale() -> Router<AppState> {
    Router::new()
        .route("/languages", get(handlers::list_languages))
        .route(
            "/locale",
            get(handlers::current_locale).post(handlers::switch_locale),
        )
}

pub fn notifications() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(handlers::list_notifications))
        .route(
            "/notifications/unread-count",
            get(handlers::unread_notification_count),
        )
        .route(
            "/notifications/read-all",
            post(handlers::mark_all_notifications_read),
        )
        .route(
            "/notifications/:id/read",
            post(handlers::mark_notification_read),
        )
        .route("/notifications/:id", delete(handlers::delete_notification))
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route(
            "/admin/languages",
            get(handlers::admin_list_languages).post(handlers::admin_create_language),
        )
        .route(
            "/admin/languages/:code",
            patch(handlers::admin_update_language),
        )
        .route("/admin/programs", post(handlers::admin_create_program))
        .route("/admin/calls", post(handlers::admin_create_call))
        .route("/admin/calls/:id", patch(handlers::admin_update_call))
        .route("/admin/resolutions", post(handlers::admin_create_resolution))
        .route(
            "/admin/resolutions/:id",
            patch(handlers::admin_update_resolution),
        )
        .route("/admin/news", post(handlers::admin_create_news_post))
        .route("/admin/news/:id", patch(handlers::admin_update_news_post))
        .route("/admin/documents", post(handlers::admin_create_document))
        .route(
            "/admin/documents/:id",
            patch(handlers::admin_update_document),
        )
        .route(
            "/admin/notifications/broadcast",
            post(handlers::admin_broadcast_notification),
        )
}
