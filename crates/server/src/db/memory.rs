//! In-process submission store.
//!
//! Used by the test suites and for running the server without a database.
//! Records live in insertion order; nothing survives a restart.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use orbit_core::{SubmissionId, SubmissionStatus};

use super::{RepositoryError, SubmissionStore};
use crate::models::{NewSubmission, Submission};

/// Submission store held in memory.
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    records: RwLock<Vec<Submission>>,
}

impl MemorySubmissionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored submissions, regardless of status.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store holds no submissions.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn create(&self, submission: NewSubmission) -> Result<Submission, RepositoryError> {
        let submission = submission.into_pending(Utc::now());
        self.records.write().await.push(submission.clone());
        Ok(submission)
    }

    async fn list_approved(&self) -> Result<Vec<Submission>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|s| s.status == SubmissionStatus::Approved)
            .cloned()
            .collect())
    }

    async fn list_pending(&self) -> Result<Vec<Submission>, RepositoryError> {
        let records = self.records.read().await;
        // Walk backwards so equal timestamps still come out newest first.
        let mut pending: Vec<Submission> = records
            .iter()
            .rev()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(pending)
    }

    async fn get(&self, id: SubmissionId) -> Result<Option<Submission>, RepositoryError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|s| s.id == id).cloned())
    }

    async fn approve(&self, id: SubmissionId) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        if let Some(submission) = records.iter_mut().find(|s| s.id == id) {
            submission.status = SubmissionStatus::Approved;
        }
        Ok(())
    }

    async fn delete(&self, id: SubmissionId) -> Result<bool, RepositoryError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|s| s.id != id);
        Ok(records.len() < before)
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
