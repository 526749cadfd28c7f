//! OAuth login route handlers.
//!
//! - Start: stores a CSRF state in the session and redirects to the provider
//! - Callback: checks the state, exchanges the code, signs the user in
//!
//! Every failure in the callback ends on the signin page with
//! `?error=OAuthError`; the cause is only logged.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::config::{OAuthClientConfig, OAuthProvider};
use crate::models::session_keys;
use crate::routes::auth::start_session;
use crate::services::auth::AuthService;
use crate::services::oauth::{authorize_url, generate_state, redirect_uri};
use crate::state::AppState;

const ERROR_REDIRECT: &str = "/signin?error=OAuthError";
const SUCCESS_REDIRECT: &str = "/dashboard";

/// Query parameters of the provider callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// State remembered between the redirect and the callback.
#[derive(Debug, Serialize, Deserialize)]
struct PendingLogin {
    provider: String,
    state: String,
}

fn enabled_client<'a>(state: &'a AppState, slug: &str) -> Option<&'a OAuthClientConfig> {
    OAuthProvider::from_slug(slug).and_then(|p| state.config().oauth.client(p))
}

/// `GET /api/auth/oauth/{provider}`
pub async fn start(
    State(state): State<AppState>,
    session: Session,
    Path(provider): Path<String>,
) -> Response {
    let Some(client) = enabled_client(&state, &provider) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let csrf_state = generate_state();
    let pending = PendingLogin {
        provider: provider.clone(),
        state: csrf_state.clone(),
    };
    if let Err(e) = session.insert(session_keys::OAUTH_STATE, &pending).await {
        tracing::error!(error = %e, "Failed to store OAuth state in session");
        return Redirect::to(ERROR_REDIRECT).into_response();
    }

    let callback = redirect_uri(&state.config().base_url, client.provider);
    match authorize_url(client, &callback, &csrf_state) {
        Ok(url) => Redirect::to(&url).into_response(),
        Err(e) => {
            tracing::error!(error = %e, provider = %provider, "Failed to build authorization URL");
            Redirect::to(ERROR_REDIRECT).into_response()
        }
    }
}

/// `GET /api/auth/oauth/{provider}/callback`
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    Path(provider): Path<String>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(client) = enabled_client(&state, &provider) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(error) = &query.error {
        tracing::warn!(provider = %provider, error = %error, "OAuth provider returned an error");
        return Redirect::to(ERROR_REDIRECT).into_response();
    }

    // One-shot: the stored state is consumed whatever the outcome
    let pending: Option<PendingLogin> = session
        .remove(session_keys::OAUTH_STATE)
        .await
        .ok()
        .flatten();

    let state_matches = matches!(
        (&pending, &query.state),
        (Some(p), Some(s)) if p.provider == provider && p.state == *s
    );
    if !state_matches {
        tracing::warn!(provider = %provider, "OAuth state mismatch");
        return Redirect::to(ERROR_REDIRECT).into_response();
    }

    let Some(code) = query.code.as_deref() else {
        tracing::warn!(provider = %provider, "OAuth callback missing code");
        return Redirect::to(ERROR_REDIRECT).into_response();
    };

    let callback = redirect_uri(&state.config().base_url, client.provider);
    let profile = match state.oauth().authenticate(client, code, &callback).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!(provider = %provider, error = %e, "OAuth authentication failed");
            return Redirect::to(ERROR_REDIRECT).into_response();
        }
    };

    let user = match AuthService::new(state.pool(), state.email())
        .login_with_oauth(client.provider, &profile)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(provider = %provider, error = %e, "Failed to link OAuth account");
            return Redirect::to(ERROR_REDIRECT).into_response();
        }
    };

    match start_session(&state, &session, jar, &user).await {
        Ok((jar, _)) => (jar, Redirect::to(SUCCESS_REDIRECT)).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start session after OAuth login");
            Redirect::to(ERROR_REDIRECT).into_response()
        }
    }
}
