//! OAuth provider client: authorization URL, code exchange, profile fetch.
//!
//! Only the authorization-code flow is supported. Which providers are
//! available is decided once at start-up by [`OAuthConfig`](crate::config::OAuthConfig).

use rand::Rng;
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use metamorph_core::{Email, EmailError};

use crate::config::{OAuthClientConfig, OAuthProvider};

const USER_AGENT: &str = "MetamorphUI";

/// Errors talking to an OAuth provider.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("provider api error: {0}")]
    Api(String),

    #[error("provider returned no verified email")]
    MissingEmail,

    #[error("provider returned an invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// The parts of a provider profile the application keeps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthProfile {
    /// Stable account id at the provider.
    pub provider_account_id: String,
    pub email: Email,
    pub name: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GitHubEmail {
    email: String,
    primary: bool,
    verified: bool,
}

struct Endpoints {
    authorize: &'static str,
    token: &'static str,
    scope: &'static str,
}

const fn endpoints(provider: OAuthProvider) -> Endpoints {
    match provider {
        OAuthProvider::Google => Endpoints {
            authorize: "https://accounts.google.com/o/oauth2/v2/auth",
            token: "https://oauth2.googleapis.com/token",
            scope: "openid email profile",
        },
        OAuthProvider::GitHub => Endpoints {
            authorize: "https://github.com/login/oauth/authorize",
            token: "https://github.com/login/oauth/access_token",
            scope: "read:user user:email",
        },
    }
}

/// Generate a random CSRF state value.
#[must_use]
pub fn generate_state() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..32)
        .filter_map(|_| CHARSET.get(rng.random_range(0..CHARSET.len())))
        .map(|&b| char::from(b))
        .collect()
}

/// Callback URL registered with the provider.
#[must_use]
pub fn redirect_uri(base_url: &str, provider: OAuthProvider) -> String {
    format!("{base_url}/api/auth/oauth/{}/callback", provider.slug())
}

/// URL to send the browser to for the provider's consent screen.
///
/// # Errors
///
/// Returns an error if the provider URL cannot be parsed.
pub fn authorize_url(
    client: &OAuthClientConfig,
    redirect_uri: &str,
    state: &str,
) -> Result<String, url::ParseError> {
    let endpoints = endpoints(client.provider);
    let mut url = url::Url::parse(endpoints.authorize)?;
    url.query_pairs_mut()
        .append_pair("client_id", &client.client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", endpoints.scope)
        .append_pair("state", state);
    Ok(url.into())
}

/// HTTP client for provider APIs.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
}

impl OAuthClient {
    #[must_use]
    pub const fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Exchange an authorization code for the user's profile.
    ///
    /// # Errors
    ///
    /// Returns `OAuthError` if the exchange or profile fetch fails, or if the
    /// provider has no verified email for the user.
    pub async fn authenticate(
        &self,
        client: &OAuthClientConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthProfile, OAuthError> {
        let access_token = self.exchange_code(client, code, redirect_uri).await?;

        match client.provider {
            OAuthProvider::Google => self.google_profile(&access_token).await,
            OAuthProvider::GitHub => self.github_profile(&access_token).await,
        }
    }

    async fn exchange_code(
        &self,
        client: &OAuthClientConfig,
        code: &str,
        redirect_uri: &str,
    ) -> Result<String, OAuthError> {
        let response: TokenResponse = self
            .http
            .post(endpoints(client.provider).token)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("client_id", client.client_id.as_str()),
                ("client_secret", client.client_secret.expose_secret()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?
            .json()
            .await?;

        response.access_token.ok_or_else(|| {
            OAuthError::TokenExchange(format!(
                "{}: {}",
                response.error.unwrap_or_else(|| "no access token".to_string()),
                response.error_description.unwrap_or_default()
            ))
        })
    }

    async fn google_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthError> {
        let info: GoogleUserInfo = self
            .get_json("https://openidconnect.googleapis.com/v1/userinfo", access_token)
            .await?;
        google_profile(info)
    }

    async fn github_profile(&self, access_token: &str) -> Result<OAuthProfile, OAuthError> {
        let user: GitHubUser = self
            .get_json("https://api.github.com/user", access_token)
            .await?;

        // The public profile email is often hidden
        let emails = if user.email.is_none() {
            self.get_json("https://api.github.com/user/emails", access_token)
                .await?
        } else {
            Vec::new()
        };

        github_profile(user, &emails)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        access_token: &str,
    ) -> Result<T, OAuthError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Api(format!("{status}: {body}")));
        }

        Ok(response.json().await?)
    }
}

fn google_profile(info: GoogleUserInfo) -> Result<OAuthProfile, OAuthError> {
    let email = info
        .email
        .filter(|_| info.email_verified)
        .ok_or(OAuthError::MissingEmail)?;

    Ok(OAuthProfile {
        provider_account_id: info.sub,
        email: Email::parse(&email)?,
        name: info.name,
        image: info.picture,
    })
}

fn github_profile(user: GitHubUser, emails: &[GitHubEmail]) -> Result<OAuthProfile, OAuthError> {
    let email = match user.email {
        Some(email) => email,
        None => emails
            .iter()
            .filter(|e| e.verified)
            .max_by_key(|e| e.primary)
            .map(|e| e.email.clone())
            .ok_or(OAuthError::MissingEmail)?,
    };

    Ok(OAuthProfile {
        provider_account_id: user.id.to_string(),
        email: Email::parse(&email)?,
        name: user.name.or(Some(user.login)),
        image: user.avatar_url,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn github_client() -> OAuthClientConfig {
        OAuthClientConfig {
            provider: OAuthProvider::GitHub,
            client_id: "gh-client".to_string(),
            client_secret: SecretString::from("gh-secret"),
        }
    }

    #[test]
    fn test_redirect_uri() {
        assert_eq!(
            redirect_uri("https://metamorph.app", OAuthProvider::Google),
            "https://metamorph.app/api/auth/oauth/google/callback"
        );
    }

    #[test]
    fn test_authorize_url_encodes_parameters() {
        let url = authorize_url(
            &github_client(),
            "http://localhost:3000/api/auth/oauth/github/callback",
            "xyz",
        )
        .unwrap();

        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=gh-client"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains(
            "redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Foauth%2Fgithub%2Fcallback"
        ));
        assert!(!url.contains("gh-secret"));
    }

    #[test]
    fn test_generate_state() {
        let state = generate_state();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_google_profile_requires_verified_email() {
        let info: GoogleUserInfo = serde_json::from_str(
            r#"{"sub":"1081","email":"ada@gmail.com","email_verified":true,"name":"Ada","picture":"https://lh3/p.png"}"#,
        )
        .unwrap();
        let profile = google_profile(info).unwrap();
        assert_eq!(profile.provider_account_id, "1081");
        assert_eq!(profile.email.as_str(), "ada@gmail.com");
        assert_eq!(profile.image.as_deref(), Some("https://lh3/p.png"));

        let unverified: GoogleUserInfo =
            serde_json::from_str(r#"{"sub":"1","email":"x@gmail.com","email_verified":false}"#)
                .unwrap();
        assert!(matches!(
            google_profile(unverified),
            Err(OAuthError::MissingEmail)
        ));
    }

    #[test]
    fn test_github_profile_prefers_public_email() {
        let user: GitHubUser = serde_json::from_str(
            r#"{"id":42,"login":"ada","name":null,"email":"ada@example.com","avatar_url":"https://avatars/42"}"#,
        )
        .unwrap();
        let profile = github_profile(user, &[]).unwrap();

        assert_eq!(profile.provider_account_id, "42");
        assert_eq!(profile.email.as_str(), "ada@example.com");
        assert_eq!(profile.name.as_deref(), Some("ada"));
    }

    #[test]
    fn test_github_profile_falls_back_to_primary_verified_email() {
        let user: GitHubUser =
            serde_json::from_str(r#"{"id":7,"login":"grace","name":"Grace","email":null}"#)
                .unwrap();
        let emails: Vec<GitHubEmail> = serde_json::from_str(
            r#"[
                {"email":"old@example.com","primary":false,"verified":true},
                {"email":"main@example.com","primary":true,"verified":true},
                {"email":"spam@example.com","primary":false,"verified":false}
            ]"#,
        )
        .unwrap();

        let profile = github_profile(user, &emails).unwrap();
        assert_eq!(profile.email.as_str(), "main@example.com");
        assert_eq!(profile.name.as_deref(), Some("Grace"));
    }

    #[test]
    fn test_github_profile_without_verified_email() {
        let user: GitHubUser =
            serde_json::from_str(r#"{"id":7,"login":"grace","email":null}"#).unwrap();
        let emails = vec![GitHubEmail {
            email: "x@example.com".to_string(),
            primary: true,
            verified: false,
        }];

        assert!(matches!(
            github_profile(user, &emails),
            Err(OAuthError::MissingEmail)
        ));
    }
}
