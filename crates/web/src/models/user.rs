//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use metamorph_core::{Email, UserId};

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name.
    pub name: Option<String>,
    /// Avatar URL.
    pub image: Option<String>,
    /// Argon2 PHC string; `None` for OAuth-only accounts.
    pub password_hash: Option<String>,
    /// When the email address was confirmed.
    pub email_verified: Option<DateTime<Utc>>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether the user has confirmed their email address.
    #[must_use]
    pub const fn is_verified(&self) -> bool {
        self.email_verified.is_some()
    }
}
