//! CLI command implementations.

pub mod migrate;
pub mod tokens;

use secrecy::SecretString;
use sqlx::PgPool;

/// Errors from CLI commands.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] metamorph_web::db::RepositoryError),
}

/// Database URL from `METAMORPH_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("METAMORPH_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("METAMORPH_DATABASE_URL"))
}

/// Connect to the application database.
async fn connect() -> Result<PgPool, CommandError> {
    let url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(metamorph_web::db::create_pool(&url).await?)
}
