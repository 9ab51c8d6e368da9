//! Schema migrations embedded from the workspace `migrations/` directory.

use sqlx::PgPool;
use sqlx::migrate::Migrator;

use indexhub_core::error::{AppError, ErrorKind};
use indexhub_core::result::AppResult;

static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply every migration the database has not seen yet.
pub async fn run_migrations(pool: &PgPool) -> AppResult<()> {
    let known = MIGRATOR.iter().count();
    tracing::info!(known, "Applying pending migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(ErrorKind::Database, format!("Migration failed: {e}"), e)
    })?;

    tracing::info!("Schema is up to date");
    Ok(())
}
