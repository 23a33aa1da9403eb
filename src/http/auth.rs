use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use axum::http::HeaderName;

use crate::app::users::UserService;
use crate::http::AppError;
use crate::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: uuid::Uuid,
}

#[derive(Debug, Clone)]
pub struct AdminToken;

const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("invalid Authorization header"))?;

        let session = state
            .auth()
            .authenticate_access_token(token)
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to authenticate access token");
                AppError::internal("failed to authenticate")
            })?
            .ok_or_else(|| AppError::unauthorized("invalid token"))?;

        // Deleted accounts keep valid tokens until expiry.
        let user = UserService::new(state.db.clone())
            .get_user(session.user_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = %session.user_id, "failed to load user");
                AppError::internal("failed to authenticate")
            })?
            .ok_or_else(|| AppError::unauthorized("invalid token"))?;

        Ok(AuthUser { user_id: user.id })
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .admin_token
            .as_ref()
            .ok_or_else(|| AppError::forbidden("admin token not configured"))?;

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::forbidden("missing admin token"))?;

        if provided != expected {
            return Err(AppError::forbidden("invalid admin token"));
        }

        Ok(AdminToken)
    }
}
