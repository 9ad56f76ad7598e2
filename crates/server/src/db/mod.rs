//! Submission persistence.
//!
//! # Database: `orbit`
//!
//! ## Tables
//!
//! - `orbit.submission` - Submitted identities and their moderation status
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p orbit-cli -- migrate
//! ```

pub mod memory;
pub mod submissions;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use orbit_core::SubmissionId;

use crate::models::{NewSubmission, Submission};

pub use memory::MemorySubmissionStore;
pub use submissions::PgSubmissionStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Durable record of submissions and their approval state.
///
/// The store is the only component that mutates submissions. Every mutation
/// touches exactly one record; concurrent approve/delete calls on the same id
/// are not coordinated and the last write wins.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Persist a new submission with `pending` status.
    async fn create(&self, submission: NewSubmission) -> Result<Submission, RepositoryError>;

    /// All approved submissions, in insertion order.
    async fn list_approved(&self) -> Result<Vec<Submission>, RepositoryError>;

    /// All pending submissions, newest first.
    async fn list_pending(&self) -> Result<Vec<Submission>, RepositoryError>;

    /// Look up a single submission.
    async fn get(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError>;

    /// Mark a submission approved. Succeeds silently if it does not exist.
    async fn approve(&self, id: SubmissionId) -> Result<(), RepositoryError>;

    /// Permanently remove a submission.
    ///
    /// Returns `true` if a record was deleted, `false` if it didn't exist.
    async fn delete(&self, id: SubmissionId) -> Result<bool, RepositoryError>;

    /// Check that the backing store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
