//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::services::auth::TokenSigner;
use crate::services::email::EmailService;
use crate::services::oauth::OAuthClient;

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid session secret: {0}")]
    SigningKey(#[from] hmac::digest::InvalidLength),
    #[error("email transport error: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    pool: PgPool,
    email: EmailService,
    oauth: OAuthClient,
    tokens: TokenSigner,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing key, SMTP transport or HTTP client
    /// cannot be set up.
    pub fn new(config: AppConfig, pool: PgPool) -> Result<Self, StateError> {
        let email = EmailService::new(config.email.as_ref(), &config.email_from, &config.base_url)?;
        Self::with_email(config, pool, email)
    }

    /// Create the state with a specific email service.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing key or HTTP client cannot be set up.
    pub fn with_email(
        config: AppConfig,
        pool: PgPool,
        email: EmailService,
    ) -> Result<Self, StateError> {
        let tokens = TokenSigner::new(&config.session_secret)?;
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                oauth: OAuthClient::new(http),
                tokens,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get a reference to the OAuth provider client.
    #[must_use]
    pub fn oauth(&self) -> &OAuthClient {
        &self.inner.oauth
    }

    /// Get a reference to the auth-token signer.
    #[must_use]
    pub fn tokens(&self) -> &TokenSigner {
        &self.inner.tokens
    }
}
