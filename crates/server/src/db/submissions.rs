//! `PostgreSQL` submission repository.
//!
//! Queries are checked at runtime (`query_as`) and mapped through
//! [`SubmissionRow`] so that invalid stored data surfaces as
//! `RepositoryError::DataCorruption` instead of a panic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use url::Url;

use orbit_core::{DisplayName, SubmissionId, SubmissionStatus};

use super::{RepositoryError, SubmissionStore};
use crate::models::{NewSubmission, Submission};

const SUBMISSION_COLUMNS: &str = "id, name, image_url, status, created_at";

/// Raw `orbit.submission` row.
#[derive(Debug, sqlx::FromRow)]
struct SubmissionRow {
    id: SubmissionId,
    name: String,
    image_url: String,
    status: SubmissionStatus,
    created_at: DateTime<Utc>,
}

impl TryFrom<SubmissionRow> for Submission {
    type Error = RepositoryError;

    fn try_from(row: SubmissionRow) -> Result<Self, Self::Error> {
        let name = DisplayName::parse(&row.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid name in database: {e}"))
        })?;
        let image_url = Url::parse(&row.image_url).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid image url in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            name,
            image_url,
            status: row.status,
            created_at: row.created_at,
        })
    }
}

fn into_submissions(rows: Vec<SubmissionRow>) -> Result<Vec<Submission>, RepositoryError> {
    rows.into_iter().map(Submission::try_from).collect()
}

/// Submission store backed by `PostgreSQL`.
#[derive(Clone)]
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    /// Create a new submission store over a connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_by_status(
        &self,
        status: SubmissionStatus,
        order: &str,
    ) -> Result<Vec<Submission>, RepositoryError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM orbit.submission WHERE status = $1 ORDER BY created_at {order}"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        into_submissions(rows)
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn create(&self, submission: NewSubmission) -> Result<Submission, RepositoryError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "INSERT INTO orbit.submission (name, image_url) VALUES ($1, $2) RETURNING {SUBMISSION_COLUMNS}"
        ))
        .bind(&submission.name)
        .bind(submission.image_url.as_str())
        .fetch_one(&self.pool)
        .await?;

        Submission::try_from(row)
    }

    async fn list_approved(&self) -> Result<Vec<Submission>, RepositoryError> {
        self.list_by_status(SubmissionStatus::Approved, "ASC").await
    }

    async fn list_pending(&self) -> Result<Vec<Submission>, RepositoryError> {
        self.list_by_status(SubmissionStatus::Pending, "DESC").await
    }

    async fn get(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM orbit.submission WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Submission::try_from).transpose()
    }

    async fn approve(&self, id: SubmissionId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE orbit.submission SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(SubmissionStatus::Approved)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete(&self, id: SubmissionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM orbit.submission WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
