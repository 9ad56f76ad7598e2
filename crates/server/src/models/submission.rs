//! Submission domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use url::Url;

use orbit_core::{DisplayName, SubmissionId, SubmissionStatus};

/// A submitted identity awaiting or past moderation.
///
/// Serialized with the field names the frontend reads (`_id`, `imageUrl`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Unique submission ID.
    #[serde(rename = "_id")]
    pub id: SubmissionId,
    /// Visitor-supplied name.
    pub name: DisplayName,
    /// Delivery URL of the hosted photo.
    pub image_url: Url,
    /// Moderation status.
    pub status: SubmissionStatus,
    /// When the submission was created. Never changes.
    pub created_at: DateTime<Utc>,
}

/// Input for creating a submission.
///
/// Holding a `NewSubmission` means the name has already passed validation.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    /// Visitor-supplied name.
    pub name: DisplayName,
    /// Delivery URL of the hosted photo.
    pub image_url: Url,
}

impl NewSubmission {
    /// Materialize a pending submission with a fresh ID and timestamp.
    #[must_use]
    pub fn into_pending(self, created_at: DateTime<Utc>) -> Submission {
        Submission {
            id: SubmissionId::generate(),
            name: self.name,
            image_url: self.image_url,
            status: SubmissionStatus::Pending,
            created_at,
        }
    }
}
