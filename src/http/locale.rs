use std::convert::Infallible;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{ACCEPT_LANGUAGE, CONTENT_LANGUAGE};
use axum::http::request::Parts;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::app::locale::{LocaleSignals, LocaleSource, ResolvedLocale};
use crate::app::sessions::{LOCALE_KEY, SESSION_COOKIE};
use crate::AppState;

pub const LOCALE_COOKIE: &str = "locale";

/// Resolves the request locale once and stores it in the request extensions.
/// Handlers read it through [`RequestLocale`].
pub async fn locale_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = match session_id(&jar) {
        Some(session_id) => state
            .sessions()
            .get(session_id, LOCALE_KEY)
            .await
            .unwrap_or_else(|err| {
                tracing::debug!(error = ?err, "failed to read session locale");
                None
            }),
        None => None,
    };

    let signals = LocaleSignals {
        session,
        cookie: jar.get(LOCALE_COOKIE).map(|cookie| cookie.value().to_string()),
        accept_language: request
            .headers()
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
    };

    let resolved = state.locale_resolver().resolve(&signals).await;
    tracing::debug!(
        locale = %resolved.locale,
        source = resolved.source.as_str(),
        "resolved request locale"
    );

    let content_language = HeaderValue::from_str(resolved.locale.as_str()).ok();
    request.extensions_mut().insert(resolved);

    let mut response = next.run(request).await;
    if let Some(value) = content_language {
        response
            .headers_mut()
            .entry(CONTENT_LANGUAGE)
            .or_insert(value);
    }
    response
}

pub fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// The locale resolved for this request.
#[derive(Debug, Clone)]
pub struct RequestLocale(pub ResolvedLocale);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequestLocale {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let resolved = parts
            .extensions
            .get::<ResolvedLocale>()
            .cloned()
            .unwrap_or_else(|| ResolvedLocale {
                locale: state.default_locale.clone(),
                source: LocaleSource::ConfigDefault,
            });
        Ok(RequestLocale(resolved))
    }
}
