//! Moderation handlers.
//!
//! Every handler here takes [`RequireAdmin`], so the token is checked before
//! any store access.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use orbit_core::SubmissionId;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAdmin;
use crate::models::Submission;
use crate::services::images::{DestroyOutcome, ImageHostError};
use crate::state::AppState;

/// Body of a successful moderation action.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

const fn message(message: &'static str) -> Json<MessageResponse> {
    Json(MessageResponse { message })
}

/// List pending submissions, newest first.
///
/// GET /api/admin/pending
#[instrument(skip_all)]
pub async fn pending(
    RequireAdmin(_claims): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Submission>>> {
    let submissions = state.store().list_pending().await?;
    Ok(Json(submissions))
}

/// Approve a submission. Unknown ids succeed without effect.
///
/// PATCH /api/admin/approve/{id}
#[instrument(skip_all, fields(submission_id = %id))]
pub async fn approve(
    RequireAdmin(_claims): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    if let Some(id) = SubmissionId::parse(&id) {
        state.store().approve(id).await?;
        moderation_breadcrumb("approve", id);
        tracing::info!(submission_id = %id, "Submission approved");
    }

    Ok(message("Node activated"))
}

/// Reject a submission by deleting it. Unknown ids succeed without effect.
///
/// The photo is destroyed after the record; a failure there is logged and
/// does not fail the request.
///
/// DELETE /api/admin/reject/{id}
#[instrument(skip_all, fields(submission_id = %id))]
pub async fn reject(
    RequireAdmin(_claims): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let Some(id) = SubmissionId::parse(&id) else {
        return Ok(message("Node purged"));
    };

    let Some(submission) = state.store().get(id).await? else {
        return Ok(message("Node purged"));
    };

    state.store().delete(id).await?;
    moderation_breadcrumb("reject", id);
    tracing::info!(submission_id = %id, "Submission rejected");

    match state.images().destroy(&submission.image_url).await {
        Ok(DestroyOutcome::Deleted) => {}
        Ok(DestroyOutcome::NotFound) => {
            tracing::warn!(submission_id = %id, "Rejected submission's image was already gone");
        }
        Err(e) => {
            tracing::error!(
                submission_id = %id,
                error = %e,
                "Failed to destroy rejected submission's image"
            );
        }
    }

    Ok(message("Node purged"))
}

/// Delete a submission and its photo.
///
/// The photo goes first: if the host fails, the record is kept so the
/// deletion can be retried. A photo the host no longer has is not an error.
///
/// DELETE /api/admin/user/{id}
#[instrument(skip_all, fields(submission_id = %id))]
pub async fn delete_user(
    RequireAdmin(_claims): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    let not_found = || AppError::NotFound("User does not exist.".to_string());

    let id = SubmissionId::parse(&id).ok_or_else(not_found)?;
    let submission = state.store().get(id).await?.ok_or_else(not_found)?;

    match state.images().destroy(&submission.image_url).await {
        Ok(DestroyOutcome::Deleted) => {}
        Ok(DestroyOutcome::NotFound) => {
            tracing::warn!(submission_id = %id, "Image already gone, deleting record anyway");
        }
        Err(ImageHostError::UnrecognizedUrl(url)) => {
            tracing::warn!(
                submission_id = %id,
                %url,
                "Image url is not hosted by us, deleting record anyway"
            );
        }
        Err(e) => return Err(e.into()),
    }

    state.store().delete(id).await?;
    moderation_breadcrumb("delete", id);
    tracing::info!(submission_id = %id, "Submission and image deleted");

    Ok(message("User and their image have been deleted."))
}

fn moderation_breadcrumb(action: &str, id: SubmissionId) {
    let id = id.to_string();
    add_breadcrumb("moderation", action, Some(&[("submission_id", id.as_str())]));
}
