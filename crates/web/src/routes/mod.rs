//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness check
//! GET  /health/ready                        - Readiness check (database)
//!
//! # Auth API
//! POST /api/auth/signup                     - Create an account, send verification email
//! GET  /api/auth/verify-email?token=        - Confirm an email address
//! POST /api/auth/resend-verification        - Send a fresh verification link
//! POST /api/auth/signin                     - Email/password sign-in
//! POST /api/auth/signout                    - End the session
//! GET  /api/auth/session                    - Current user, if any
//!
//! # OAuth
//! GET  /api/auth/oauth/{provider}           - Redirect to the provider
//! GET  /api/auth/oauth/{provider}/callback  - Handle the provider callback
//!
//! # Preferences API
//! POST /api/user/preferences/language       - Save the interface language
//! GET  /api/user/preferences/theme          - Effective theme
//! POST /api/user/preferences/theme          - Save the theme
//!
//! # Dashboard (requires auth)
//! GET  /dashboard                           - Project overview page
//! GET  /api/projects                        - Project list as JSON
//! ```

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod oauth;
pub mod preferences;

use axum::{
    Router,
    extract::Request,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{preferences_middleware, request_id_middleware};
use crate::state::AppState;

/// Create the auth API routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/verify-email", get(auth::verify_email))
        .route("/resend-verification", post(auth::resend_verification))
        .route("/signin", post(auth::signin))
        .route("/signout", post(auth::signout))
        .route("/session", get(auth::current_session))
        .route("/oauth/{provider}", get(oauth::start))
        .route("/oauth/{provider}/callback", get(oauth::callback))
}

/// Create the preference API routes router.
pub fn preference_routes() -> Router<AppState> {
    Router::new()
        .route("/language", post(preferences::set_language))
        .route(
            "/theme",
            get(preferences::get_theme).post(preferences::set_theme),
        )
}

/// Create all routes, without middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/auth", auth_routes())
        .nest("/api/user/preferences", preference_routes())
        .route("/api/projects", get(dashboard::list_projects))
        .route("/dashboard", get(dashboard::index))
}

/// Build the application router with its per-request middleware.
///
/// The session layer is not included: the caller adds it over the store it
/// wants (Postgres in production, in-memory in tests).
pub fn app(state: AppState) -> Router {
    routes()
        .layer(from_fn_with_state(state.clone(), preferences_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}
