//! `PostgreSQL`-backed preference store.

use sqlx::PgPool;

use metamorph_core::{Locale, Preference, Theme, UserId};

use super::PreferenceStore;
use crate::db::RepositoryError;

/// A preference persisted in a column of `users`.
pub trait PreferenceColumn: Preference {
    /// Reads the column for user `$1`.
    const SELECT: &'static str;
    /// Sets the column to `$2` for user `$1`.
    const UPDATE: &'static str;
    /// Sets the column to `$2` for user `$1` only when it holds no supported value.
    const FILL: &'static str;
}

impl PreferenceColumn for Theme {
    const SELECT: &'static str = "SELECT theme FROM users WHERE id = $1";
    const UPDATE: &'static str = "UPDATE users SET theme = $2, updated_at = NOW() WHERE id = $1";
    const FILL: &'static str = r"
        UPDATE users SET theme = $2, updated_at = NOW()
        WHERE id = $1 AND (theme IS NULL OR theme NOT IN ('light', 'dark', 'system'))
        ";
}

impl PreferenceColumn for Locale {
    const SELECT: &'static str = "SELECT language FROM users WHERE id = $1";
    const UPDATE: &'static str =
        "UPDATE users SET language = $2, updated_at = NOW() WHERE id = $1";
    const FILL: &'static str = r"
        UPDATE users SET language = $2, updated_at = NOW()
        WHERE id = $1 AND (language IS NULL OR language NOT IN ('fr', 'en'))
        ";
}

/// Preference store over the `users` table.
#[derive(Debug, Clone, Copy)]
pub struct PgPreferenceStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PgPreferenceStore<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl<P: PreferenceColumn> PreferenceStore<P> for PgPreferenceStore<'_> {
    async fn load(&self, user_id: UserId) -> Result<Option<String>, RepositoryError> {
        // Outer None: no such user. Inner None: column is NULL.
        let value = sqlx::query_scalar::<_, Option<String>>(P::SELECT)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(value.flatten())
    }

    async fn store(&self, user_id: UserId, value: P) -> Result<(), RepositoryError> {
        let result = sqlx::query(P::UPDATE)
            .bind(user_id)
            .bind(value.as_str())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn fill(&self, user_id: UserId, value: P) -> Result<bool, RepositoryError> {
        let result = sqlx::query(P::FILL)
            .bind(user_id)
            .bind(value.as_str())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
