//! Signed auth-token cookie.
//!
//! The token lets a browser stay signed in after its server-side session
//! has expired, and lets middleware identify the user without touching
//! the session store. Format: `<user_id>.<expires_unix>.<hex hmac-sha256>`.

use axum_extra::extract::cookie::{Cookie, SameSite};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use metamorph_core::UserId;

type HmacSha256 = Hmac<Sha256>;

/// Name of the auth-token cookie.
pub const AUTH_COOKIE_NAME: &str = "mui_auth";

/// How long an issued token stays valid (30 days).
pub const TOKEN_LIFETIME_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Reasons a token is rejected.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("signature mismatch")]
    BadSignature,
    #[error("token expired")]
    Expired,
}

/// Issues and verifies auth tokens with a server-side key.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Create a signer keyed with `secret`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is rejected by the MAC.
    pub fn new(secret: &SecretString) -> Result<Self, hmac::digest::InvalidLength> {
        let mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())?;
        Ok(Self { mac })
    }

    /// Issue a token for `user_id`, valid for [`TOKEN_LIFETIME_SECONDS`] from `now`.
    #[must_use]
    pub fn issue(&self, user_id: UserId, now: i64) -> String {
        let payload = format!("{user_id}.{}", now + TOKEN_LIFETIME_SECONDS);
        let signature = hex::encode(self.sign(&payload));
        format!("{payload}.{signature}")
    }

    /// Check a token and return the user it was issued for.
    ///
    /// # Errors
    ///
    /// Returns `TokenError` if the token is malformed, carries a bad
    /// signature, or expired before `now`.
    pub fn verify(&self, token: &str, now: i64) -> Result<UserId, TokenError> {
        let (payload, signature) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;
        let signature = hex::decode(signature).map_err(|_| TokenError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let (user_id, expires) = payload.split_once('.').ok_or(TokenError::Malformed)?;
        let user_id: UserId = user_id.parse().map_err(|_| TokenError::Malformed)?;
        let expires: i64 = expires.parse().map_err(|_| TokenError::Malformed)?;

        if expires <= now {
            return Err(TokenError::Expired);
        }

        Ok(user_id)
    }

    fn sign(&self, payload: &str) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }
}

/// Cookie carrying a freshly issued token.
#[must_use]
pub fn auth_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE_NAME, token))
        .path("/")
        .max_age(time::Duration::seconds(TOKEN_LIFETIME_SECONDS))
        .same_site(SameSite::Lax)
        .http_only(true)
        .secure(secure)
        .build()
}

/// Cookie used to remove the token on signout.
#[must_use]
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(AUTH_COOKIE_NAME).path("/").build()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: i64 = 1_760_000_000;

    fn signer(secret: &str) -> TokenSigner {
        TokenSigner::new(&SecretString::from(secret)).unwrap()
    }

    #[test]
    fn test_issue_then_verify() {
        let signer = signer("k3J9x!Qz7@Lm2#Rt5$Wv8^Yb1&Nc4*Hd6");
        let token = signer.issue(UserId::new(42), NOW);

        assert!(token.starts_with("42."));
        assert_eq!(signer.verify(&token, NOW + 60), Ok(UserId::new(42)));
    }

    #[test]
    fn test_expired_token() {
        let signer = signer("k3J9x!Qz7@Lm2#Rt5$Wv8^Yb1&Nc4*Hd6");
        let token = signer.issue(UserId::new(1), NOW);

        assert_eq!(
            signer.verify(&token, NOW + TOKEN_LIFETIME_SECONDS),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn test_tampered_user_id() {
        let signer = signer("k3J9x!Qz7@Lm2#Rt5$Wv8^Yb1&Nc4*Hd6");
        let token = signer.issue(UserId::new(1), NOW);
        let forged = token.replacen("1.", "2.", 1);

        assert_eq!(signer.verify(&forged, NOW), Err(TokenError::BadSignature));
    }

    #[test]
    fn test_other_key_rejected() {
        let token = signer("first-key-aaaaaaaaaaaaaaaaaaaaaaa").issue(UserId::new(5), NOW);

        assert_eq!(
            signer("second-key-bbbbbbbbbbbbbbbbbbbbbb").verify(&token, NOW),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn test_malformed_tokens() {
        let signer = signer("k3J9x!Qz7@Lm2#Rt5$Wv8^Yb1&Nc4*Hd6");

        for token in ["", "garbage", "1.2.not-hex", "abc.zz"] {
            assert_eq!(signer.verify(token, NOW), Err(TokenError::Malformed), "{token}");
        }
    }

    #[test]
    fn test_auth_cookie_attributes() {
        let cookie = auth_cookie("1.2.ab".to_string(), true);

        assert_eq!(cookie.name(), AUTH_COOKIE_NAME);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }
}
