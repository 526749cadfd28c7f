//! Server configuration loaded from environment variables.
//!
//! Everything is read once at start-up into [`AppConfig`] and shared
//! read-only through `AppState`.
//!
//! # Environment Variables
//!
//! ## Required
//! - `METAMORPH_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `METAMORPH_BASE_URL` - Public URL of the site, used in emails and OAuth redirects
//! - `METAMORPH_SESSION_SECRET` - Auth-token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `METAMORPH_HOST` - Bind address (default: 127.0.0.1)
//! - `METAMORPH_PORT` - Listen port (default: 3000)
//! - `SMTP_HOST` - Enables email delivery; without it verification links are logged
//! - `SMTP_PORT` - SMTP port (default: 587)
//! - `SMTP_USERNAME` / `SMTP_PASSWORD` - Required when `SMTP_HOST` is set
//! - `EMAIL_FROM` - Sender address (default: onboarding@resend.dev)
//! - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` - Enables Google sign-in
//! - `GITHUB_CLIENT_ID` / `GITHUB_CLIENT_SECRET` - Enables GitHub sign-in
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` / `SENTRY_TRACES_SAMPLE_RATE` - Sampling (default: 1.0 / 0.1)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const DEFAULT_EMAIL_FROM: &str = "onboarding@resend.dev";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL, without trailing slash
    pub base_url: String,
    /// Key for the auth-token cookie signature
    pub session_secret: SecretString,
    /// SMTP settings; `None` runs email in log-only development mode
    pub email: Option<EmailConfig>,
    /// Sender address for transactional email
    pub email_from: String,
    /// OAuth sign-in providers that have credentials configured
    pub oauth: OAuthConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
}

/// SMTP configuration.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct EmailConfig {
    /// SMTP relay host
    pub smtp_host: String,
    /// SMTP port (STARTTLS)
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_username: String,
    /// SMTP password
    pub smtp_password: SecretString,
}

impl std::fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &"[REDACTED]")
            .finish()
    }
}

/// Supported OAuth sign-in providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OAuthProvider {
    Google,
    GitHub,
}

impl OAuthProvider {
    /// Every provider the application knows how to talk to.
    pub const ALL: [Self; 2] = [Self::GitHub, Self::Google];

    /// URL path segment and `accounts.provider` value.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::GitHub => "github",
        }
    }

    /// Look a provider up by its slug.
    #[must_use]
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.slug() == slug)
    }

    const fn env_prefix(self) -> &'static str {
        match self {
            Self::Google => "GOOGLE",
            Self::GitHub => "GITHUB",
        }
    }
}

/// Client credentials for one OAuth provider.
#[derive(Clone)]
pub struct OAuthClientConfig {
    pub provider: OAuthProvider,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl std::fmt::Debug for OAuthClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthClientConfig")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

/// The set of enabled OAuth providers, fixed at start-up.
#[derive(Debug, Clone, Default)]
pub struct OAuthConfig {
    clients: Vec<OAuthClientConfig>,
}

impl OAuthConfig {
    /// Build from an explicit list of clients.
    #[must_use]
    pub const fn new(clients: Vec<OAuthClientConfig>) -> Self {
        Self { clients }
    }

    /// Credentials for `provider`, if it is enabled.
    #[must_use]
    pub fn client(&self, provider: OAuthProvider) -> Option<&OAuthClientConfig> {
        self.clients.iter().find(|c| c.provider == provider)
    }

    /// Enabled providers in display order.
    pub fn providers(&self) -> impl Iterator<Item = OAuthProvider> + '_ {
        self.clients.iter().map(|c| c.provider)
    }

    fn from_env() -> Self {
        let clients = OAuthProvider::ALL
            .into_iter()
            .filter_map(|provider| {
                let prefix = provider.env_prefix();
                let id = get_optional_env(&format!("{prefix}_CLIENT_ID"));
                let secret = get_optional_env(&format!("{prefix}_CLIENT_SECRET"));
                match (id, secret) {
                    (Some(client_id), Some(client_secret)) => {
                        tracing::info!(provider = provider.slug(), "OAuth provider configured");
                        Some(OAuthClientConfig {
                            provider,
                            client_id,
                            client_secret: SecretString::from(client_secret),
                        })
                    }
                    _ => {
                        tracing::warn!(
                            provider = provider.slug(),
                            "OAuth credentials not found in environment, provider disabled"
                        );
                        None
                    }
                }
            })
            .collect();

        Self { clients }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("METAMORPH_DATABASE_URL")?;
        let host = get_env_or_default("METAMORPH_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("METAMORPH_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("METAMORPH_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("METAMORPH_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_required_env("METAMORPH_BASE_URL")?
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("METAMORPH_BASE_URL".to_string(), e.to_string())
        })?;
        let session_secret = get_validated_secret("METAMORPH_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "METAMORPH_SESSION_SECRET")?;

        let email = EmailConfig::from_env()?;
        let email_from = get_env_or_default("EMAIL_FROM", DEFAULT_EMAIL_FROM);
        let oauth = OAuthConfig::from_env();

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = parse_rate("SENTRY_SAMPLE_RATE", 1.0)?;
        let sentry_traces_sample_rate = parse_rate("SENTRY_TRACES_SAMPLE_RATE", 0.1)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            session_secret,
            email,
            email_from,
            oauth,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(smtp_host) = get_optional_env("SMTP_HOST") else {
            return Ok(None);
        };

        let smtp_port = get_env_or_default("SMTP_PORT", "587")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("SMTP_PORT".to_string(), e.to_string()))?;

        Ok(Some(Self {
            smtp_host,
            smtp_port,
            smtp_username: get_required_env("SMTP_USERNAME")?,
            smtp_password: get_validated_secret("SMTP_PASSWORD")?,
        }))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a sampling rate in `0.0..=1.0`.
fn parse_rate(key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(default);
    };
    let rate = raw
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !(0.0..=1.0).contains(&rate) {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be between 0.0 and 1.0 (got {rate})"),
        ));
    }
    Ok(rate)
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            database_url: SecretString::from("postgres://localhost/metamorph_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            session_secret: SecretString::from("k3J9x!Qz7@Lm2#Rt5$Wv8^Yb1&Nc4*Hd6"),
            email: None,
            email_from: DEFAULT_EMAIL_FROM.to_string(),
            oauth: OAuthConfig::default(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.1,
        }
    }

    #[test]
    fn test_shannon_entropy_edges() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("zzzzzz") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        for value in ["your-session-key", "changeme123", "my-secret-value"] {
            let err = validate_secret_strength(value, "TEST_VAR").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)), "{value}");
        }
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength(&"ab".repeat(20), "TEST_VAR");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("k3J9x!Qz7@Lm2#Rt5$Wv8^Yb1&Nc4*Hd6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "S").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "S").is_ok());
    }

    #[test]
    fn test_socket_addr_and_secure_flag() {
        let mut config = test_config();
        let addr = config.socket_addr();
        assert_eq!(addr.port(), 3000);
        assert!(!config.is_secure());

        config.base_url = "https://app.metamorph.dev".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_oauth_provider_slugs() {
        assert_eq!(OAuthProvider::from_slug("github"), Some(OAuthProvider::GitHub));
        assert_eq!(OAuthProvider::from_slug("google"), Some(OAuthProvider::Google));
        assert_eq!(OAuthProvider::from_slug("gitlab"), None);
    }

    #[test]
    fn test_oauth_config_lookup() {
        let oauth = OAuthConfig::new(vec![OAuthClientConfig {
            provider: OAuthProvider::GitHub,
            client_id: "gh-client".to_string(),
            client_secret: SecretString::from("gh-secret"),
        }]);

        assert!(oauth.client(OAuthProvider::GitHub).is_some());
        assert!(oauth.client(OAuthProvider::Google).is_none());
        assert_eq!(oauth.providers().collect::<Vec<_>>(), vec![OAuthProvider::GitHub]);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let email = EmailConfig {
            smtp_host: "smtp.resend.com".to_string(),
            smtp_port: 587,
            smtp_username: "resend".to_string(),
            smtp_password: SecretString::from("re_live_abcdef"),
        };
        let client = OAuthClientConfig {
            provider: OAuthProvider::Google,
            client_id: "google-client".to_string(),
            client_secret: SecretString::from("GOCSPX-hidden"),
        };

        let output = format!("{email:?} {client:?}");
        assert!(output.contains("smtp.resend.com"));
        assert!(output.contains("google-client"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("re_live_abcdef"));
        assert!(!output.contains("GOCSPX-hidden"));
    }
}
