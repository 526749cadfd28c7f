//! Session middleware configuration.

use tower_sessions::{
    Expiry, SessionManagerLayer, SessionStore,
    cookie::{SameSite, time::Duration},
};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "mui_session";

/// Sessions end after 30 days without a request.
const SESSION_INACTIVITY_DAYS: i64 = 30;

/// Build the session layer over `store`.
///
/// Production uses `tower_sessions_sqlx_store::PostgresStore`, whose table is
/// created by the migrations; tests pass a `MemoryStore`.
#[must_use]
pub fn session_layer<S>(store: S, secure: bool) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_INACTIVITY_DAYS)))
        .with_secure(secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
