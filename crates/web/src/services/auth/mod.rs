//! Authentication service.
//!
//! Password signup with email verification, password login, and account
//! linking for OAuth logins.

mod error;
mod store;
mod token;

pub use error::AuthError;
pub use store::{AuthStore, PgAuthStore};
pub use token::{
    AUTH_COOKIE_NAME, TOKEN_LIFETIME_SECONDS, TokenError, TokenSigner, auth_cookie,
    removal_cookie,
};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;

use metamorph_core::Email;

use crate::config::OAuthProvider;
use crate::db::RepositoryError;
use crate::db::verification_tokens::VerificationToken;
use crate::models::User;
use crate::services::email::EmailService;
use crate::services::oauth::OAuthProfile;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// How long a verification link stays valid.
const VERIFICATION_TOKEN_HOURS: i64 = 24;

/// Input to [`AuthService::sign_up`], as submitted by the signup form.
#[derive(Debug, Default, serde::Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Result of a resend-verification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    /// No account uses the address. Reported to the client like `Sent`.
    NoAccount,
    AlreadyVerified,
    Sent,
}

/// Authentication service.
pub struct AuthService<'a, S = PgAuthStore<'a>> {
    store: S,
    email: &'a EmailService,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service over the database.
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService) -> Self {
        Self::with_store(PgAuthStore::new(pool), email)
    }
}

impl<'a, S: AuthStore> AuthService<'a, S> {
    /// Create an authentication service over any store.
    #[must_use]
    pub const fn with_store(store: S, email: &'a EmailService) -> Self {
        Self { store, email }
    }

    // =========================================================================
    // Signup & Verification
    // =========================================================================

    /// Register a new, unverified user and email them a verification link.
    ///
    /// A failure to deliver the email is logged and does not fail signup.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingCredentials` if the email or password is empty.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UnverifiedAccountExists` or `AuthError::UserAlreadyExists`
    /// if the email is already registered.
    pub async fn sign_up(&self, request: &SignupRequest) -> Result<User, AuthError> {
        let (Some(email), Some(password)) = (
            non_empty(request.email.as_deref()),
            non_empty(request.password.as_deref()),
        ) else {
            return Err(AuthError::MissingCredentials);
        };

        validate_password(password)?;
        let email = Email::parse(email)?;

        if let Some(existing) = self.store.user_by_email(&email).await? {
            return Err(if existing.is_verified() {
                AuthError::UserAlreadyExists
            } else {
                AuthError::UnverifiedAccountExists
            });
        }

        let password_hash = hash_password(password)?;
        let name = non_empty(request.name.as_deref());

        let user = self
            .store
            .create_password_user(&email, name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        let token = self.issue_verification_token(&email).await?;
        self.deliver_verification(&email, &token, name).await;

        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Confirm the email address a verification token was issued for.
    ///
    /// The token is consumed on success and deleted when found expired.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingToken`, `AuthError::InvalidToken` or
    /// `AuthError::ExpiredToken` for unusable tokens, and
    /// `AuthError::UserNotFound` if the account no longer exists.
    pub async fn verify_email(&self, token: Option<&str>) -> Result<(), AuthError> {
        let token = require_token(token)?;

        let record = self
            .store
            .find_token(token)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        if let Err(e) = check_expiry(&record, Utc::now()) {
            self.store.delete_token(token).await?;
            return Err(e);
        }

        let user = match Email::parse(&record.identifier) {
            Ok(email) => self.store.user_by_email(&email).await?,
            Err(_) => None,
        }
        .ok_or(AuthError::UserNotFound)?;

        self.store.mark_email_verified(user.id).await?;
        self.store.delete_token(token).await?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(())
    }

    /// Replace any outstanding verification tokens for `email` with a new one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingEmail` if no email was given, or
    /// `AuthError::Repository` if the database fails.
    pub async fn resend_verification(
        &self,
        email: Option<&str>,
    ) -> Result<ResendOutcome, AuthError> {
        let raw = non_empty(email).ok_or(AuthError::MissingEmail)?;

        // An unparseable address cannot belong to an account
        let Ok(email) = Email::parse(raw) else {
            return Ok(ResendOutcome::NoAccount);
        };

        let Some(user) = self.store.user_by_email(&email).await? else {
            return Ok(ResendOutcome::NoAccount);
        };

        if user.is_verified() {
            return Ok(ResendOutcome::AlreadyVerified);
        }

        self.store.delete_tokens_for(&email).await?;
        let token = self.issue_verification_token(&email).await?;
        self.deliver_verification(&email, &token, user.name.as_deref())
            .await;

        Ok(ResendOutcome::Sent)
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Login with email and password.
    ///
    /// The password is checked before the verification status so an
    /// unverified account is only revealed to someone who knows its password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::EmailNotVerified` if the email was never confirmed.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .store
            .user_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let password_hash = user
            .password_hash
            .as_deref()
            .ok_or(AuthError::InvalidCredentials)?;
        verify_password(password, password_hash)?;

        if !user.is_verified() {
            return Err(AuthError::EmailNotVerified);
        }

        Ok(user)
    }

    /// Find or create the user behind an OAuth login and link the provider account.
    ///
    /// An existing user with the same email is reused, and the provider's
    /// confirmation of the address counts as verification.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the database fails.
    pub async fn login_with_oauth(
        &self,
        provider: OAuthProvider,
        profile: &OAuthProfile,
    ) -> Result<User, AuthError> {
        if let Some(user_id) = self
            .store
            .account_user(provider.slug(), &profile.provider_account_id)
            .await?
        {
            return self
                .store
                .user_by_id(user_id)
                .await?
                .ok_or(AuthError::UserNotFound);
        }

        let user = match self.store.user_by_email(&profile.email).await? {
            Some(user) => {
                if !user.is_verified() {
                    self.store.mark_email_verified(user.id).await?;
                }
                user
            }
            None => {
                self.store
                    .create_verified_user(
                        &profile.email,
                        profile.name.as_deref(),
                        profile.image.as_deref(),
                    )
                    .await?
            }
        };

        self.store
            .link_account(user.id, provider.slug(), &profile.provider_account_id)
            .await?;

        tracing::info!(
            user_id = %user.id,
            provider = provider.slug(),
            "Linked OAuth account"
        );
        Ok(user)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn issue_verification_token(&self, email: &Email) -> Result<String, AuthError> {
        let token = generate_verification_token();
        let expires = Utc::now() + Duration::hours(VERIFICATION_TOKEN_HOURS);

        self.store.create_token(email, &token, expires).await?;

        Ok(token)
    }

    async fn deliver_verification(&self, email: &Email, token: &str, name: Option<&str>) {
        if let Err(e) = self.email.send_verification_email(email, token, name).await {
            tracing::error!(error = %e, to = %email, "Failed to send verification email");
        }
    }
}

/// 32 random bytes, hex encoded.
#[must_use]
pub fn generate_verification_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn require_token(token: Option<&str>) -> Result<&str, AuthError> {
    non_empty(token).ok_or(AuthError::MissingToken)
}

fn check_expiry(token: &VerificationToken, now: DateTime<Utc>) -> Result<(), AuthError> {
    if token.expires < now {
        return Err(AuthError::ExpiredToken);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use metamorph_core::UserId;

    use super::*;

    fn token_expiring(expires: DateTime<Utc>) -> VerificationToken {
        VerificationToken {
            token: generate_verification_token(),
            identifier: "ada@metamorph.app".to_string(),
            expires,
        }
    }

    #[test]
    fn test_generated_token_shape() {
        let token = generate_verification_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_verification_token());
    }

    #[test]
    fn test_require_token() {
        assert!(matches!(require_token(None), Err(AuthError::MissingToken)));
        assert!(matches!(require_token(Some("")), Err(AuthError::MissingToken)));
        assert!(matches!(require_token(Some("  ")), Err(AuthError::MissingToken)));
        assert_eq!(require_token(Some("abc")).unwrap(), "abc");
    }

    #[test]
    fn test_check_expiry() {
        let now = Utc::now();

        assert!(check_expiry(&token_expiring(now + Duration::hours(1)), now).is_ok());
        assert!(check_expiry(&token_expiring(now), now).is_ok());
        assert!(matches!(
            check_expiry(&token_expiring(now - Duration::seconds(1)), now),
            Err(AuthError::ExpiredToken)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("12345"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("123456").is_ok());
        // Counted in characters, not bytes
        assert!(validate_password("éééééé").is_ok());
        assert!(validate_password("ééééé").is_err());
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    // =========================================================================
    // Service flows over an in-memory store
    // =========================================================================

    #[derive(Default)]
    struct MemoryAuthStore {
        users: Mutex<Vec<User>>,
        tokens: Mutex<Vec<VerificationToken>>,
        accounts: Mutex<Vec<(String, String, UserId)>>,
    }

    impl MemoryAuthStore {
        fn insert_user(&self, email: &str, password: Option<&str>, verified: bool) -> User {
            let mut users = self.users.lock().unwrap();
            let now = Utc::now();
            let user = User {
                id: UserId::new(i32::try_from(users.len()).unwrap() + 1),
                email: Email::parse(email).unwrap(),
                name: None,
                image: None,
                password_hash: password.map(|p| hash_password(p).unwrap()),
                email_verified: verified.then_some(now),
                created_at: now,
                updated_at: now,
            };
            users.push(user.clone());
            user
        }

        fn insert_token(&self, identifier: &str, token: &str, expires: DateTime<Utc>) {
            self.tokens.lock().unwrap().push(VerificationToken {
                token: token.to_string(),
                identifier: identifier.to_string(),
                expires,
            });
        }

        fn user(&self, email: &str) -> Option<User> {
            self.users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email.as_str() == email)
                .cloned()
        }

        fn tokens_for(&self, identifier: &str) -> Vec<VerificationToken> {
            self.tokens
                .lock()
                .unwrap()
                .iter()
                .filter(|t| t.identifier == identifier)
                .cloned()
                .collect()
        }

        fn create_user(
            &self,
            email: &Email,
            name: Option<&str>,
            image: Option<&str>,
            password_hash: Option<&str>,
            verified: bool,
        ) -> Result<User, RepositoryError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| &u.email == email) {
                return Err(RepositoryError::Conflict("email".to_string()));
            }
            let now = Utc::now();
            let user = User {
                id: UserId::new(i32::try_from(users.len()).unwrap() + 1),
                email: email.clone(),
                name: name.map(str::to_string),
                image: image.map(str::to_string),
                password_hash: password_hash.map(str::to_string),
                email_verified: verified.then_some(now),
                created_at: now,
                updated_at: now,
            };
            users.push(user.clone());
            Ok(user)
        }
    }

    impl AuthStore for &MemoryAuthStore {
        async fn user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
            Ok(self.user(email.as_str()))
        }

        async fn user_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.id == id)
                .cloned())
        }

        async fn create_password_user(
            &self,
            email: &Email,
            name: Option<&str>,
            password_hash: &str,
        ) -> Result<User, RepositoryError> {
            self.create_user(email, name, None, Some(password_hash), false)
        }

        async fn create_verified_user(
            &self,
            email: &Email,
            name: Option<&str>,
            image: Option<&str>,
        ) -> Result<User, RepositoryError> {
            self.create_user(email, name, image, None, true)
        }

        async fn mark_email_verified(&self, id: UserId) -> Result<(), RepositoryError> {
            let mut users = self.users.lock().unwrap();
            let user = users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(RepositoryError::NotFound)?;
            user.email_verified = Some(Utc::now());
            Ok(())
        }

        async fn create_token(
            &self,
            email: &Email,
            token: &str,
            expires: DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            self.insert_token(email.as_str(), token, expires);
            Ok(())
        }

        async fn find_token(
            &self,
            token: &str,
        ) -> Result<Option<VerificationToken>, RepositoryError> {
            Ok(self
                .tokens
                .lock()
                .unwrap()
                .iter()
                .find(|t| t.token == token)
                .cloned())
        }

        async fn delete_token(&self, token: &str) -> Result<(), RepositoryError> {
            self.tokens.lock().unwrap().retain(|t| t.token != token);
            Ok(())
        }

        async fn delete_tokens_for(&self, email: &Email) -> Result<u64, RepositoryError> {
            let mut tokens = self.tokens.lock().unwrap();
            let before = tokens.len();
            tokens.retain(|t| t.identifier != email.as_str());
            Ok(u64::try_from(before - tokens.len()).unwrap())
        }

        async fn account_user(
            &self,
            provider: &str,
            provider_account_id: &str,
        ) -> Result<Option<UserId>, RepositoryError> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .iter()
                .find(|(p, id, _)| p == provider && id == provider_account_id)
                .map(|(_, _, user_id)| *user_id))
        }

        async fn link_account(
            &self,
            user_id: UserId,
            provider: &str,
            provider_account_id: &str,
        ) -> Result<(), RepositoryError> {
            let mut accounts = self.accounts.lock().unwrap();
            if !accounts
                .iter()
                .any(|(p, id, _)| p == provider && id == provider_account_id)
            {
                accounts.push((
                    provider.to_string(),
                    provider_account_id.to_string(),
                    user_id,
                ));
            }
            Ok(())
        }
    }

    fn mailer() -> EmailService {
        EmailService::log_only("noreply@metamorph.app", "http://localhost:3000")
    }

    fn signup(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            name: Some("Ada".to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn test_sign_up_creates_unverified_user_and_day_long_token() {
        let store = MemoryAuthStore::default();
        let email = mailer();
        let service = AuthService::with_store(&store, &email);

        let before = Utc::now();
        let user = service
            .sign_up(&signup("ada@metamorph.app", "secret1"))
            .await
            .unwrap();

        assert!(!user.is_verified());
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert!(user.password_hash.unwrap().starts_with("$argon2id$"));

        let tokens = store.tokens_for("ada@metamorph.app");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token.len(), 64);
        assert!(tokens[0].expires >= before + Duration::hours(24));
        assert!(tokens[0].expires <= Utc::now() + Duration::hours(24));
    }

    #[tokio::test]
    async fn test_sign_up_rejects_registered_addresses() {
        let store = MemoryAuthStore::default();
        store.insert_user("pending@metamorph.app", Some("secret1"), false);
        store.insert_user("done@metamorph.app", Some("secret1"), true);
        let email = mailer();
        let service = AuthService::with_store(&store, &email);

        assert!(matches!(
            service
                .sign_up(&signup("pending@metamorph.app", "secret1"))
                .await,
            Err(AuthError::UnverifiedAccountExists)
        ));
        assert!(matches!(
            service.sign_up(&signup("done@metamorph.app", "secret1")).await,
            Err(AuthError::UserAlreadyExists)
        ));
        assert!(matches!(
            service.sign_up(&signup("new@metamorph.app", "short")).await,
            Err(AuthError::WeakPassword(_))
        ));
        assert!(matches!(
            service.sign_up(&SignupRequest::default()).await,
            Err(AuthError::MissingCredentials)
        ));
        assert!(store.user("new@metamorph.app").is_none());
    }

    #[tokio::test]
    async fn test_verify_email_consumes_valid_token() {
        let store = MemoryAuthStore::default();
        store.insert_user("ada@metamorph.app", Some("secret1"), false);
        store.insert_token("ada@metamorph.app", "valid", Utc::now() + Duration::hours(1));
        let email = mailer();
        let service = AuthService::with_store(&store, &email);

        service.verify_email(Some("valid")).await.unwrap();

        assert!(store.user("ada@metamorph.app").unwrap().is_verified());
        assert!(store.tokens_for("ada@metamorph.app").is_empty());
    }

    #[tokio::test]
    async fn test_verify_email_deletes_expired_token_and_leaves_user_unverified() {
        let store = MemoryAuthStore::default();
        store.insert_user("ada@metamorph.app", Some("secret1"), false);
        store.insert_token("ada@metamorph.app", "stale", Utc::now() - Duration::minutes(1));
        let email = mailer();
        let service = AuthService::with_store(&store, &email);

        let err = service.verify_email(Some("stale")).await.unwrap_err();

        assert!(matches!(err, AuthError::ExpiredToken));
        assert!(!store.user("ada@metamorph.app").unwrap().is_verified());
        assert!(store.tokens_for("ada@metamorph.app").is_empty());
    }

    #[tokio::test]
    async fn test_verify_email_unusable_tokens() {
        let store = MemoryAuthStore::default();
        store.insert_token("gone@metamorph.app", "orphan", Utc::now() + Duration::hours(1));
        let email = mailer();
        let service = AuthService::with_store(&store, &email);

        assert!(matches!(
            service.verify_email(None).await,
            Err(AuthError::MissingToken)
        ));
        assert!(matches!(
            service.verify_email(Some("unknown")).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            service.verify_email(Some("orphan")).await,
            Err(AuthError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_resend_replaces_outstanding_tokens() {
        let store = MemoryAuthStore::default();
        store.insert_user("ada@metamorph.app", Some("secret1"), false);
        store.insert_user("done@metamorph.app", Some("secret1"), true);
        store.insert_token("ada@metamorph.app", "old-1", Utc::now() + Duration::hours(1));
        store.insert_token("ada@metamorph.app", "old-2", Utc::now() + Duration::hours(2));
        let email = mailer();
        let service = AuthService::with_store(&store, &email);

        let outcome = service
            .resend_verification(Some("ada@metamorph.app"))
            .await
            .unwrap();

        assert_eq!(outcome, ResendOutcome::Sent);
        let tokens = store.tokens_for("ada@metamorph.app");
        assert_eq!(tokens.len(), 1);
        assert!(!tokens[0].token.starts_with("old-"));

        assert_eq!(
            service
                .resend_verification(Some("done@metamorph.app"))
                .await
                .unwrap(),
            ResendOutcome::AlreadyVerified
        );
        assert_eq!(
            service
                .resend_verification(Some("nobody@metamorph.app"))
                .await
                .unwrap(),
            ResendOutcome::NoAccount
        );
        assert!(matches!(
            service.resend_verification(Some(" ")).await,
            Err(AuthError::MissingEmail)
        ));
    }

    #[tokio::test]
    async fn test_password_login_checks_password_before_verification() {
        let store = MemoryAuthStore::default();
        store.insert_user("pending@metamorph.app", Some("secret1"), false);
        store.insert_user("done@metamorph.app", Some("secret1"), true);
        store.insert_user("oauth@metamorph.app", None, true);
        let email = mailer();
        let service = AuthService::with_store(&store, &email);

        assert!(matches!(
            service
                .login_with_password("pending@metamorph.app", "wrong-pass")
                .await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service
                .login_with_password("pending@metamorph.app", "secret1")
                .await,
            Err(AuthError::EmailNotVerified)
        ));
        assert!(matches!(
            service
                .login_with_password("oauth@metamorph.app", "secret1")
                .await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service
                .login_with_password("nobody@metamorph.app", "secret1")
                .await,
            Err(AuthError::InvalidCredentials)
        ));

        let user = service
            .login_with_password("done@metamorph.app", "secret1")
            .await
            .unwrap();
        assert_eq!(user.email.as_str(), "done@metamorph.app");
    }

    #[tokio::test]
    async fn test_oauth_login_links_existing_user_by_email() {
        let store = MemoryAuthStore::default();
        let existing = store.insert_user("ada@metamorph.app", Some("secret1"), false);
        let email = mailer();
        let service = AuthService::with_store(&store, &email);
        let profile = OAuthProfile {
            provider_account_id: "gh-42".to_string(),
            email: Email::parse("ada@metamorph.app").unwrap(),
            name: Some("Ada".to_string()),
            image: None,
        };

        let user = service
            .login_with_oauth(OAuthProvider::GitHub, &profile)
            .await
            .unwrap();
        assert_eq!(user.id, existing.id);
        assert!(store.user("ada@metamorph.app").unwrap().is_verified());

        // Second login resolves through the linked account
        let again = service
            .login_with_oauth(OAuthProvider::GitHub, &profile)
            .await
            .unwrap();
        assert_eq!(again.id, existing.id);
        assert_eq!(store.accounts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_oauth_login_creates_verified_user() {
        let store = MemoryAuthStore::default();
        let email = mailer();
        let service = AuthService::with_store(&store, &email);
        let profile = OAuthProfile {
            provider_account_id: "g-7".to_string(),
            email: Email::parse("new@metamorph.app").unwrap(),
            name: None,
            image: Some("https://example.com/a.png".to_string()),
        };

        let user = service
            .login_with_oauth(OAuthProvider::Google, &profile)
            .await
            .unwrap();

        assert!(user.is_verified());
        assert!(user.password_hash.is_none());
        assert_eq!(user.image.as_deref(), Some("https://example.com/a.png"));
    }
}
