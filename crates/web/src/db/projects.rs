//! Project repository for the dashboard.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use metamorph_core::{ProjectId, UserId};

use super::RepositoryError;
use crate::models::ProjectSummary;

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: ProjectId,
    name: String,
    figma_file_id: String,
    created_at: DateTime<Utc>,
    token_count: i64,
}

/// Repository for user projects.
pub struct ProjectRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProjectRepository<'a> {
    /// Create a new project repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's projects, newest first, with their design token counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ProjectSummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProjectRow>(
            r"
            SELECT p.id, p.name, p.figma_file_id, p.created_at,
                   COUNT(t.id) AS token_count
            FROM projects p
            LEFT JOIN design_tokens t ON t.project_id = p.id
            WHERE p.user_id = $1
            GROUP BY p.id
            ORDER BY p.created_at DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| ProjectSummary {
                id: r.id,
                name: r.name,
                figma_file_id: r.figma_file_id,
                created_at: r.created_at,
                token_count: r.token_count,
            })
            .collect())
    }
}
