//! OAuth account link repository.

use sqlx::PgPool;

use metamorph_core::UserId;

use super::RepositoryError;

/// Repository for links between users and OAuth provider accounts.
pub struct AccountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AccountRepository<'a> {
    /// Create a new account repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Find the user linked to a provider account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_user(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<UserId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, UserId>(
            "SELECT user_id FROM accounts WHERE provider = $1 AND provider_account_id = $2",
        )
        .bind(provider)
        .bind(provider_account_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(id)
    }

    /// Link a provider account to a user. Linking twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn link(
        &self,
        user_id: UserId,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO accounts (user_id, provider, provider_account_id) VALUES ($1, $2, $3) \
             ON CONFLICT (provider, provider_account_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(provider)
        .bind(provider_account_id)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
