//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. Session layer (tower-sessions, added by the binary)
//! 3. `TraceLayer` (request tracing)
//! 4. Request ID (add unique ID to each request)
//! 5. Preferences (resolve theme and language for pages)
//!
//! Layers 3 to 5 are applied by [`crate::routes::app`].

pub mod auth;
pub mod preferences;
pub mod request_id;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use preferences::{ResolvedPreferences, preferences_middleware};
pub use request_id::request_id_middleware;
pub use session::session_layer;
