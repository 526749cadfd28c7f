//! Page-level preference resolution.
//!
//! Runs for page requests, resolves theme and language for the visitor and
//! makes them available to handlers as [`ResolvedPreferences`]. Only the
//! auth-token cookie is used to identify the user here, since the session
//! store is not consulted on every page view.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use metamorph_core::{Locale, Theme};

use crate::services::identity::token_identity;
use crate::services::preferences::{PgPreferenceStore, PreferenceContext, resolve, sync_cookie};
use crate::state::AppState;

/// Paths the middleware leaves alone.
const SKIPPED_PREFIXES: &[&str] = &["/api/", "/static/", "/health", "/favicon"];

/// Theme and language for the current page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvedPreferences {
    pub locale: Locale,
    pub theme: Theme,
}

impl<S> FromRequestParts<S> for ResolvedPreferences
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    /// Defaults apply when the middleware did not run for this request.
    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Self>().copied().unwrap_or_default())
    }
}

/// Whether `path` is a page the middleware should handle.
#[must_use]
pub fn is_page_path(path: &str) -> bool {
    !SKIPPED_PREFIXES.iter().any(|p| path.starts_with(p))
}

/// Resolve preferences for page requests and keep the cookies in sync.
pub async fn preferences_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if !is_page_path(request.uri().path()) {
        return next.run(request).await;
    }

    let headers = request.headers().clone();
    let user_id = token_identity(&jar, state.tokens());
    let ctx = PreferenceContext::new(user_id, &jar, &headers);
    let store = PgPreferenceStore::new(state.pool());

    let resolved = ResolvedPreferences {
        locale: resolve::<Locale, _>(&store, &ctx).await.value,
        theme: resolve::<Theme, _>(&store, &ctx).await.value,
    };
    request.extensions_mut().insert(resolved);

    let response = next.run(request).await;

    let jar = sync_cookie(sync_cookie(jar, resolved.locale), resolved.theme);
    (jar, response).into_response()
}
