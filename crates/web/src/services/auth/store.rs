//! Persistence used by the authentication service.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use metamorph_core::{Email, UserId};

use crate::db::verification_tokens::VerificationToken;
use crate::db::{
    AccountRepository, RepositoryError, UserRepository, VerificationTokenRepository,
};
use crate::models::User;

/// Users, verification tokens and OAuth links, as seen by [`super::AuthService`].
pub trait AuthStore: Sync {
    fn user_by_email(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    fn user_by_id(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Create an unverified user. Fails with `Conflict` if the email is taken.
    fn create_password_user(
        &self,
        email: &Email,
        name: Option<&str>,
        password_hash: &str,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    /// Create a user whose email is already confirmed.
    fn create_verified_user(
        &self,
        email: &Email,
        name: Option<&str>,
        image: Option<&str>,
    ) -> impl Future<Output = Result<User, RepositoryError>> + Send;

    fn mark_email_verified(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn create_token(
        &self,
        email: &Email,
        token: &str,
        expires: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find_token(
        &self,
        token: &str,
    ) -> impl Future<Output = Result<Option<VerificationToken>, RepositoryError>> + Send;

    fn delete_token(&self, token: &str)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete every token issued for `email`, returning how many went.
    fn delete_tokens_for(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;

    fn account_user(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> impl Future<Output = Result<Option<UserId>, RepositoryError>> + Send;

    /// Record that the provider account belongs to `user_id`. Idempotent.
    fn link_account(
        &self,
        user_id: UserId,
        provider: &str,
        provider_account_id: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// [`AuthStore`] over the `PostgreSQL` repositories.
#[derive(Debug, Clone, Copy)]
pub struct PgAuthStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgAuthStore<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl AuthStore for PgAuthStore<'_> {
    async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(self.pool).get_by_email(email).await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        UserRepository::new(self.pool).get_by_id(id).await
    }

    async fn create_password_user(
        &self,
        email: &Email,
        name: Option<&str>,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        UserRepository::new(self.pool)
            .create_with_password(email, name, password_hash)
            .await
    }

    async fn create_verified_user(
        &self,
        email: &Email,
        name: Option<&str>,
        image: Option<&str>,
    ) -> Result<User, RepositoryError> {
        UserRepository::new(self.pool)
            .create_verified(email, name, image)
            .await
    }

    async fn mark_email_verified(&self, id: UserId) -> Result<(), RepositoryError> {
        UserRepository::new(self.pool).mark_email_verified(id).await
    }

    async fn create_token(
        &self,
        email: &Email,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        VerificationTokenRepository::new(self.pool)
            .create(email, token, expires)
            .await
    }

    async fn find_token(&self, token: &str) -> Result<Option<VerificationToken>, RepositoryError> {
        VerificationTokenRepository::new(self.pool).find(token).await
    }

    async fn delete_token(&self, token: &str) -> Result<(), RepositoryError> {
        VerificationTokenRepository::new(self.pool).delete(token).await
    }

    async fn delete_tokens_for(&self, email: &Email) -> Result<u64, RepositoryError> {
        VerificationTokenRepository::new(self.pool)
            .delete_for_identifier(email)
            .await
    }

    async fn account_user(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<UserId>, RepositoryError> {
        AccountRepository::new(self.pool)
            .find_user(provider, provider_account_id)
            .await
    }

    async fn link_account(
        &self,
        user_id: UserId,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<(), RepositoryError> {
        AccountRepository::new(self.pool)
            .link(user_id, provider, provider_account_id)
            .await
    }
}
