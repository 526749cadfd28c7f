//! Dashboard project types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use metamorph_core::ProjectId;

/// Number of projects a user may own.
pub const MAX_PROJECTS: usize = 3;

/// A project as listed on the dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: ProjectId,
    pub name: String,
    pub figma_file_id: String,
    pub created_at: DateTime<Utc>,
    /// Number of design tokens extracted for the project.
    pub token_count: i64,
}
