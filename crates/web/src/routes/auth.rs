//! Authentication API handlers.
//!
//! Signup, email verification, password signin/signout and session info.
//! Messages shown to users are in French, matching the signup pages.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::{
    AuthError, AuthService, ResendOutcome, SignupRequest, auth_cookie, removal_cookie,
};
use crate::state::AppState;

// =============================================================================
// Request Types
// =============================================================================

/// Query of `GET /api/auth/verify-email`.
#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: Option<String>,
}

/// Body of `POST /api/auth/resend-verification`.
#[derive(Debug, Default, Deserialize)]
pub struct ResendRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Body of `POST /api/auth/signin`.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// The signed-in user, or `null`.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user: Option<CurrentUser>,
}

/// A confirmation shown to the user.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

const fn message(message: &'static str) -> Json<MessageResponse> {
    Json(MessageResponse { message })
}

// =============================================================================
// Signup & Verification
// =============================================================================

/// `POST /api/auth/signup`
///
/// An unreadable body is handled like an empty form.
///
/// # Errors
///
/// Returns 400 for missing fields, short passwords and existing accounts.
pub async fn signup(
    State(state): State<AppState>,
    body: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Response> {
    let request = body.map(|Json(b)| b).unwrap_or_default();

    AuthService::new(state.pool(), state.email())
        .sign_up(&request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Compte créé avec succès. Veuillez vérifier votre email pour activer votre compte.",
            "requiresVerification": true,
        })),
    )
        .into_response())
}

/// `GET /api/auth/verify-email?token=...`
///
/// # Errors
///
/// Returns 400 for missing, unknown or expired tokens and 404 if the account is gone.
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<Json<MessageResponse>> {
    AuthService::new(state.pool(), state.email())
        .verify_email(query.token.as_deref())
        .await?;

    Ok(message(
        "Email vérifié avec succès. Vous pouvez maintenant vous connecter.",
    ))
}

/// `POST /api/auth/resend-verification`
///
/// Unknown addresses get the same answer as known ones.
///
/// # Errors
///
/// Returns 400 if no email was given.
pub async fn resend_verification(
    State(state): State<AppState>,
    body: std::result::Result<Json<ResendRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let outcome = AuthService::new(state.pool(), state.email())
        .resend_verification(request.email.as_deref())
        .await?;

    Ok(message(match outcome {
        ResendOutcome::NoAccount => {
            "Si un compte existe avec cet email, un nouveau lien de vérification a été envoyé."
        }
        ResendOutcome::AlreadyVerified => {
            "Cet email est déjà vérifié. Vous pouvez vous connecter."
        }
        ResendOutcome::Sent => {
            "Un nouveau lien de vérification a été envoyé à votre adresse email."
        }
    }))
}

// =============================================================================
// Signin & Signout
// =============================================================================

/// `POST /api/auth/signin`
///
/// # Errors
///
/// Returns 401 for wrong credentials and 403 for unverified accounts.
pub async fn signin(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    body: std::result::Result<Json<SigninRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let Ok(Json(request)) = body else {
        return Err(AuthError::InvalidCredentials.into());
    };

    let user = AuthService::new(state.pool(), state.email())
        .login_with_password(&request.email, &request.password)
        .await?;

    let (jar, current) = start_session(&state, &session, jar, &user).await?;

    Ok((
        jar,
        Json(SessionResponse {
            user: Some(current),
        }),
    ))
}

/// `POST /api/auth/signout`
pub async fn signout(session: Session, jar: CookieJar) -> (StatusCode, CookieJar) {
    if let Err(e) = clear_current_user(&session).await {
        tracing::warn!(error = %e, "Failed to clear session on signout");
    }
    clear_sentry_user();

    (StatusCode::NO_CONTENT, jar.remove(removal_cookie()))
}

/// `GET /api/auth/session`
pub async fn current_session(OptionalAuth(user): OptionalAuth) -> Json<SessionResponse> {
    Json(SessionResponse { user })
}

/// Sign `user` in: store them in the session and issue the auth-token cookie.
pub(crate) async fn start_session(
    state: &AppState,
    session: &Session,
    jar: CookieJar,
    user: &User,
) -> Result<(CookieJar, CurrentUser)> {
    let current = CurrentUser::from(user);

    set_current_user(session, &current).await.map_err(|e| {
        AppError::Internal(format!("failed to store session: {e}"))
    })?;

    let token = state
        .tokens()
        .issue(user.id, chrono::Utc::now().timestamp());
    let jar = jar.add(auth_cookie(token, state.config().is_secure()));

    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "User signed in");

    Ok((jar, current))
}
