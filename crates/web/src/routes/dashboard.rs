//! Dashboard route handlers.
//!
//! These routes require authentication.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, extract::State};
use serde::Serialize;

use metamorph_core::{Locale, Theme};

use crate::db::ProjectRepository;
use crate::error::Result;
use crate::middleware::{RequireAuth, ResolvedPreferences};
use crate::models::{MAX_PROJECTS, ProjectSummary};
use crate::state::AppState;

/// Interface text for the dashboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardText {
    pub title: &'static str,
    pub greeting: &'static str,
    pub projects: &'static str,
    pub new_project: &'static str,
    pub limit_reached: &'static str,
    pub empty: &'static str,
    pub tokens: &'static str,
}

impl DashboardText {
    #[must_use]
    pub const fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::Fr => Self {
                title: "Tableau de bord",
                greeting: "Bonjour",
                projects: "Projets",
                new_project: "Nouveau projet",
                limit_reached: "Limite de projets atteinte",
                empty: "Aucun projet pour le moment.",
                tokens: "tokens",
            },
            Locale::En => Self {
                title: "Dashboard",
                greeting: "Hello",
                projects: "Projects",
                new_project: "New project",
                limit_reached: "Project limit reached",
                empty: "No projects yet.",
                tokens: "tokens",
            },
        }
    }
}

/// Project display data for templates.
pub struct ProjectView {
    pub name: String,
    pub figma_file_id: String,
    pub created: String,
    pub token_count: i64,
}

impl From<ProjectSummary> for ProjectView {
    fn from(p: ProjectSummary) -> Self {
        Self {
            name: p.name,
            figma_file_id: p.figma_file_id,
            created: p.created_at.format("%Y-%m-%d").to_string(),
            token_count: p.token_count,
        }
    }
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub lang: Locale,
    pub theme: Theme,
    pub text: DashboardText,
    pub display_name: String,
    pub projects: Vec<ProjectView>,
    pub max_projects: usize,
    pub can_create: bool,
}

/// Projects listed for the signed-in user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectsResponse {
    pub projects: Vec<ProjectSummary>,
    pub max_projects: usize,
}

/// `GET /dashboard`
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    prefs: ResolvedPreferences,
) -> Result<DashboardTemplate> {
    let projects = ProjectRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    let display_name = user.name.unwrap_or_else(|| user.email.to_string());

    Ok(DashboardTemplate {
        lang: prefs.locale,
        theme: prefs.theme,
        text: DashboardText::for_locale(prefs.locale),
        display_name,
        can_create: projects.len() < MAX_PROJECTS,
        max_projects: MAX_PROJECTS,
        projects: projects.into_iter().map(ProjectView::from).collect(),
    })
}

/// `GET /api/projects`
pub async fn list_projects(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProjectsResponse>> {
    let projects = ProjectRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;

    Ok(Json(ProjectsResponse {
        projects,
        max_projects: MAX_PROJECTS,
    }))
}
