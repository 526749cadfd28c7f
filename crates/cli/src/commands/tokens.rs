//! Verification token maintenance.

use metamorph_web::db::VerificationTokenRepository;

use super::{CommandError, connect};

/// Delete every verification token whose expiry has passed.
///
/// # Errors
///
/// Returns an error if the database is unreachable or the delete fails.
pub async fn purge_expired() -> Result<(), CommandError> {
    let pool = connect().await?;

    let deleted = VerificationTokenRepository::new(&pool)
        .purge_expired()
        .await?;

    tracing::info!(deleted, "Expired verification tokens purged");
    Ok(())
}
