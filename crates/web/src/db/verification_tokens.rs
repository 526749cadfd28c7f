//! Verification token repository.
//!
//! Tokens are keyed by their random value and point at an email address
//! (`identifier`), not a user id: the user row may change between signup
//! and the click on the link.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use metamorph_core::Email;

use super::{RepositoryError, conflict_on_unique};

/// A stored verification token.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct VerificationToken {
    pub token: String,
    pub identifier: String,
    pub expires: DateTime<Utc>,
}

/// Repository for email verification tokens.
pub struct VerificationTokenRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VerificationTokenRepository<'a> {
    /// Create a new verification token repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a new token for `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a token collision.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO verification_tokens (identifier, token, expires) VALUES ($1, $2, $3)")
            .bind(email)
            .bind(token)
            .bind(expires)
            .execute(self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "verification token"))?;

        Ok(())
    }

    /// Look a token up by its value.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, token: &str) -> Result<Option<VerificationToken>, RepositoryError> {
        let row = sqlx::query_as::<_, VerificationToken>(
            "SELECT token, identifier, expires FROM verification_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Delete a single token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, token: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM verification_tokens WHERE token = $1")
            .bind(token)
            .execute(self.pool)
            .await?;

        Ok(())
    }

    /// Delete every token issued for `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_identifier(&self, email: &Email) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE identifier = $1")
            .bind(email)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete tokens whose expiry is in the past.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE expires < NOW()")
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
