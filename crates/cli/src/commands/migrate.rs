//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! orbit-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `ORBIT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`, then `DB_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/server/migrations/` and are embedded at
//! compile time.

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use thiserror::Error;

/// Environment variables checked for the database URL, in order.
const DATABASE_URL_VARS: [&str; 3] = ["ORBIT_DATABASE_URL", "DATABASE_URL", "DB_URL"];

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// No database URL variable is set.
    #[error("Missing environment variable: ORBIT_DATABASE_URL")]
    MissingEnvVar,

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

fn database_url() -> Result<SecretString, MigrationError> {
    DATABASE_URL_VARS
        .iter()
        .find_map(|key| std::env::var(key).ok())
        .map(SecretString::from)
        .ok_or(MigrationError::MissingEnvVar)
}

/// Run the server's database migrations.
///
/// # Errors
///
/// Returns an error if the URL is missing, the database is unreachable, or a
/// migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let _ = dotenvy::dotenv();

    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = PgPool::connect(database_url.expose_secret()).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
