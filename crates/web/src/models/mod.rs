//! Domain models for the web server.

pub mod project;
pub mod session;
pub mod user;

pub use project::{MAX_PROJECTS, ProjectSummary};
pub use session::{CurrentUser, keys as session_keys};
pub use user::User;
