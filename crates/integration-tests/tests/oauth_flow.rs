//! Router tests for the OAuth redirect and callback guards.

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use secrecy::SecretString;
use tower::ServiceExt;

use metamorph_integration_tests::test_app;
use metamorph_web::config::{OAuthClientConfig, OAuthConfig, OAuthProvider};

fn github_only() -> Router {
    test_app(OAuthConfig::new(vec![OAuthClientConfig {
        provider: OAuthProvider::GitHub,
        client_id: "gh-client".to_string(),
        client_secret: SecretString::from("gh-secret"),
    }]))
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn location(response: &axum::response::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_unknown_provider_is_not_found() {
    let response = github_only()
        .oneshot(get("/api/auth/oauth/myspace"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unconfigured_provider_is_not_found() {
    let response = github_only()
        .oneshot(get("/api/auth/oauth/google"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_redirects_to_provider() {
    let response = github_only()
        .oneshot(get("/api/auth/oauth/github"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    assert!(target.starts_with("https://github.com/login/oauth/authorize?"));
    assert!(target.contains("client_id=gh-client"));
    assert!(target.contains("state="));

    let session_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("mui_session="));
    assert!(session_cookie, "state must be kept in the session");
}

#[tokio::test]
async fn test_callback_without_pending_state_fails() {
    let response = github_only()
        .oneshot(get("/api/auth/oauth/github/callback?code=abc&state=forged"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/signin?error=OAuthError");
}

#[tokio::test]
async fn test_callback_with_wrong_state_fails() {
    let app = github_only();

    let start = app
        .clone()
        .oneshot(get("/api/auth/oauth/github"))
        .await
        .unwrap();
    let cookie = start
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("mui_session="))
        .and_then(|v| v.split(';').next())
        .unwrap()
        .to_string();

    let response = app
        .oneshot(
            Request::get("/api/auth/oauth/github/callback?code=abc&state=forged")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/signin?error=OAuthError");
}

#[tokio::test]
async fn test_callback_with_provider_error() {
    let response = github_only()
        .oneshot(get("/api/auth/oauth/github/callback?error=access_denied"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/signin?error=OAuthError");
}
