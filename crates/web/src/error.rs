//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All API handlers return `Result<T, AppError>`
//! and errors reach the client as `{"error": "<message>"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized")]
    Unauthorized,

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Database(_)
                | Self::Internal(_)
                | Self::Auth(AuthError::Repository(_) | AuthError::PasswordHash)
        )
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::MissingCredentials
                | AuthError::MissingEmail
                | AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::UnverifiedAccountExists
                | AuthError::UserAlreadyExists
                | AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::ExpiredToken => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::EmailNotVerified => StatusCode::FORBIDDEN,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Message shown to the client. Internal details are never exposed.
    fn client_message(&self) -> String {
        if self.is_server_error() {
            return "Internal server error".to_string();
        }

        match self {
            Self::Auth(err) => auth_message(err).to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::BadRequest(msg) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

const fn auth_message(err: &AuthError) -> &'static str {
    match err {
        AuthError::MissingCredentials => "Email et mot de passe requis",
        AuthError::MissingEmail => "Email requis",
        AuthError::InvalidEmail(_) => "Adresse email invalide",
        AuthError::WeakPassword(_) => "Le mot de passe doit contenir au moins 6 caractères",
        AuthError::UnverifiedAccountExists => {
            "Un compte avec cet email existe déjà mais n'a pas été vérifié."
        }
        AuthError::UserAlreadyExists => {
            "Un compte avec cet email existe déjà. Connectez-vous plutôt."
        }
        AuthError::InvalidCredentials => "Invalid credentials",
        AuthError::EmailNotVerified => {
            "Email not verified. Please check your email and click the verification link."
        }
        AuthError::MissingToken => "Token de vérification manquant",
        AuthError::InvalidToken => "Token de vérification invalide",
        AuthError::ExpiredToken => {
            "Le token de vérification a expiré. Veuillez demander un nouveau lien."
        }
        AuthError::UserNotFound => "Utilisateur introuvable",
        AuthError::Repository(_) | AuthError::PasswordHash => "Internal server error",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let message = self.client_message();

        let body = if matches!(self, Self::Auth(AuthError::UnverifiedAccountExists)) {
            json!({
                "error": message,
                "requiresVerification": true,
                "resendVerificationUrl": "/resend-verification",
            })
        } else {
            json!({ "error": message })
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("project-123".to_string());
        assert_eq!(err.to_string(), "Not found: project-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(get_status(AppError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AuthError::EmailNotVerified.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AuthError::UserNotFound.into()),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn test_unauthorized_body() {
        let (status, body) = body_json(AppError::Unauthorized).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, json!({ "error": "Unauthorized" }));
    }

    #[tokio::test]
    async fn test_bad_request_body_is_verbatim() {
        let msg = r#"Invalid theme. Must be "light", "dark", or "system"."#;
        let (_, body) = body_json(AppError::BadRequest(msg.to_string())).await;
        assert_eq!(body["error"], msg);
    }

    #[tokio::test]
    async fn test_server_errors_are_generic() {
        let err = AppError::Database(RepositoryError::DataCorruption("secret detail".into()));
        let (status, body) = body_json(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_unverified_signup_hint() {
        let (status, body) = body_json(AuthError::UnverifiedAccountExists.into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["requiresVerification"], true);
        assert_eq!(body["resendVerificationUrl"], "/resend-verification");
    }
}
