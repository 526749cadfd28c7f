//! Database migration command.
//!
//! Migrations live in `crates/web/migrations/` and are embedded at compile
//! time. They are never run by the server on start-up.

use super::{CommandError, connect};

/// Run all pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../web/migrations").run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
