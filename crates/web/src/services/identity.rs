//! Who is making the request.
//!
//! Two lookups exist. Handlers behind the session layer use
//! [`session_identity`], which trusts the server-side session first and
//! falls back to the auth-token cookie. Page middleware only has the
//! cookies, so it uses [`token_identity`].

use axum_extra::extract::cookie::CookieJar;
use tower_sessions::Session;

use metamorph_core::UserId;

use crate::models::{CurrentUser, session_keys};
use crate::services::auth::{AUTH_COOKIE_NAME, TokenSigner};

/// The signed-in user from the session, or else from the auth-token cookie.
pub async fn session_identity(
    session: &Session,
    jar: &CookieJar,
    signer: &TokenSigner,
) -> Option<UserId> {
    match session.get::<CurrentUser>(session_keys::CURRENT_USER).await {
        Ok(Some(user)) => return Some(user.id),
        Ok(None) => {}
        Err(e) => tracing::debug!(error = %e, "Failed to read session user"),
    }

    token_identity(jar, signer)
}

/// The user named by a valid auth-token cookie.
#[must_use]
pub fn token_identity(jar: &CookieJar, signer: &TokenSigner) -> Option<UserId> {
    let cookie = jar.get(AUTH_COOKIE_NAME)?;
    let now = chrono::Utc::now().timestamp();

    signer
        .verify(cookie.value(), now)
        .inspect_err(|e| tracing::debug!(error = %e, "Ignoring auth token"))
        .ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum_extra::extract::cookie::Cookie;
    use metamorph_core::Email;
    use secrecy::SecretString;
    use tower_sessions::MemoryStore;

    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(&SecretString::from("k3J9x!Qz7@Lm2#Rt5$Wv8^Yb1&Nc4*Hd6")).unwrap()
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn token_jar(signer: &TokenSigner, user_id: UserId) -> CookieJar {
        let token = signer.issue(user_id, chrono::Utc::now().timestamp());
        CookieJar::new().add(Cookie::new(AUTH_COOKIE_NAME, token))
    }

    #[test]
    fn test_token_identity() {
        let signer = signer();
        let jar = token_jar(&signer, UserId::new(3));

        assert_eq!(token_identity(&jar, &signer), Some(UserId::new(3)));
        assert_eq!(token_identity(&CookieJar::new(), &signer), None);
    }

    #[test]
    fn test_token_identity_ignores_garbage() {
        let jar = CookieJar::new().add(Cookie::new(AUTH_COOKIE_NAME, "3.9999999999.deadbeef"));
        assert_eq!(token_identity(&jar, &signer()), None);
    }

    #[tokio::test]
    async fn test_session_user_takes_precedence() {
        let signer = signer();
        let session = session();
        session
            .insert(
                session_keys::CURRENT_USER,
                CurrentUser {
                    id: UserId::new(10),
                    email: Email::parse("ada@metamorph.app").unwrap(),
                    name: None,
                    image: None,
                },
            )
            .await
            .unwrap();
        let jar = token_jar(&signer, UserId::new(20));

        assert_eq!(
            session_identity(&session, &jar, &signer).await,
            Some(UserId::new(10))
        );
    }

    #[tokio::test]
    async fn test_session_falls_back_to_token() {
        let signer = signer();
        let jar = token_jar(&signer, UserId::new(20));

        assert_eq!(
            session_identity(&session(), &jar, &signer).await,
            Some(UserId::new(20))
        );
        assert_eq!(
            session_identity(&session(), &CookieJar::new(), &signer).await,
            None
        );
    }
}
