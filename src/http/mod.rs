use axum::middleware;
use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod locale;
mod routes;

pub use auth::{AdminToken, AuthUser};
pub use error::AppError;
pub use locale::{RequestLocale, LOCALE_COOKIE};

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::locale())
        .merge(routes::notifications())
        .merge(routes::admin())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            locale::locale_middleware,
        ))
        .with_state(state)
}
