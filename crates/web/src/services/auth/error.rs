//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Signup without an email or password.
    #[error("email and password are required")]
    MissingCredentials,

    /// Resend request without an email.
    #[error("email is required")]
    MissingEmail,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] metamorph_core::EmailError),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Signup for an address whose account was never verified.
    #[error("unverified account already exists")]
    UnverifiedAccountExists,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Correct credentials, but the email was never confirmed.
    #[error("email not verified")]
    EmailNotVerified,

    /// Verification request without a token.
    #[error("verification token missing")]
    MissingToken,

    /// Verification token unknown or already used.
    #[error("verification token invalid")]
    InvalidToken,

    /// Verification token past its expiry.
    #[error("verification token expired")]
    ExpiredToken,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
