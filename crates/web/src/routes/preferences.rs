//! User preference API handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use metamorph_core::{Locale, Theme};

use crate::error::AppError;
use crate::services::identity::session_identity;
use crate::services::preferences::{self, PgPreferenceStore, PreferenceColumn, PreferenceContext};
use crate::state::AppState;

const INVALID_LANGUAGE: &str = r#"Invalid language. Must be "fr" or "en"."#;
const INVALID_THEME: &str = r#"Invalid theme. Must be "light", "dark", or "system"."#;

/// Body of `POST /api/user/preferences/language`.
#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub language: Locale,
}

/// Body of `POST /api/user/preferences/theme`.
#[derive(Debug, Deserialize)]
pub struct ThemeRequest {
    pub theme: Theme,
}

#[derive(Debug, Serialize)]
pub struct LanguageSaved {
    pub success: bool,
    pub language: Locale,
}

#[derive(Debug, Serialize)]
pub struct ThemeSaved {
    pub success: bool,
    pub theme: Theme,
}

/// Current effective theme for the caller.
#[derive(Debug, Serialize)]
pub struct ThemeResponse {
    pub theme: Theme,
}

/// `GET /api/user/preferences/theme`
pub async fn get_theme(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    headers: HeaderMap,
) -> Json<ThemeResponse> {
    let user_id = session_identity(&session, &jar, state.tokens()).await;
    let ctx = PreferenceContext::new(user_id, &jar, &headers);
    let store = PgPreferenceStore::new(state.pool());

    let resolution = preferences::resolve::<Theme, _>(&store, &ctx).await;
    Json(ThemeResponse {
        theme: resolution.value,
    })
}

/// `POST /api/user/preferences/theme`
pub async fn set_theme(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    body: Result<Json<ThemeRequest>, JsonRejection>,
) -> Response {
    save_for_session(
        &state,
        &session,
        jar,
        body.map(|Json(b)| b.theme),
        INVALID_THEME,
        |theme| Json(ThemeSaved { success: true, theme }).into_response(),
    )
    .await
}

/// `POST /api/user/preferences/language`
pub async fn set_language(
    State(state): State<AppState>,
    session: Session,
    jar: CookieJar,
    body: Result<Json<LanguageRequest>, JsonRejection>,
) -> Response {
    save_for_session(
        &state,
        &session,
        jar,
        body.map(|Json(b)| b.language),
        INVALID_LANGUAGE,
        |language| {
            Json(LanguageSaved {
                success: true,
                language,
            })
            .into_response()
        },
    )
    .await
}

/// Shared body of the POST handlers: signed-in check, validation, save.
async fn save_for_session<P, F>(
    state: &AppState,
    session: &Session,
    jar: CookieJar,
    value: Result<P, JsonRejection>,
    invalid_message: &str,
    respond: F,
) -> Response
where
    P: PreferenceColumn,
    F: FnOnce(P) -> Response,
{
    let Some(user_id) = session_identity(session, &jar, state.tokens()).await else {
        return AppError::Unauthorized.into_response();
    };

    let value = match value {
        Ok(value) => value,
        Err(rejection) => {
            tracing::debug!(kind = P::KIND, error = %rejection, "Rejected preference update");
            return AppError::BadRequest(invalid_message.to_string()).into_response();
        }
    };

    let store = PgPreferenceStore::new(state.pool());
    let (jar, result) = preferences::save(&store, jar, Some(user_id), value).await;

    match result {
        Ok(()) => {
            tracing::info!(kind = P::KIND, %user_id, %value, "Preference updated");
            (jar, respond(value)).into_response()
        }
        Err(e) => (jar, AppError::from(e)).into_response(),
    }
}
