//! Public submission handlers.

use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;
use tracing::instrument;

use orbit_core::{DisplayName, DisplayNameError, SubmissionId};

use super::MAX_IMAGE_BYTES;
use crate::error::{AppError, Result};
use crate::models::{NewSubmission, Submission};
use crate::services::images::ImageUpload;
use crate::state::AppState;

const MISSING_IMAGE: &str = "No node asset detected. Please upload a photo!";
const MISSING_NAME: &str = "Identity signature required. Please provide a name.";
const NAME_TOO_LONG: &str = "Name is too long. Max 50 characters.";
const NOT_AN_IMAGE: &str = "Only images are allowed!";
const IMAGE_TOO_LARGE: &str = "Image is too large. Max 5MB.";
const MALFORMED_BODY: &str = "Malformed submission. Send multipart form data.";

/// Response for an accepted submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub message: &'static str,
    pub node_id: SubmissionId,
}

/// Fields collected from the multipart body.
#[derive(Debug, Default)]
struct ConnectForm {
    name: Option<String>,
    image: Option<ImageUpload>,
}

fn multipart_error(err: &MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::BadRequest(IMAGE_TOO_LARGE.to_string())
    } else {
        tracing::debug!(error = %err, "Rejected multipart body");
        AppError::BadRequest(MALFORMED_BODY.to_string())
    }
}

async fn read_image(field: Field<'_>) -> Result<ImageUpload> {
    let content_type = field
        .content_type()
        .map(str::to_ascii_lowercase)
        .filter(|ct| ct.starts_with("image/"))
        .ok_or_else(|| AppError::BadRequest(NOT_AN_IMAGE.to_string()))?;
    let file_name = field.file_name().map(String::from);

    let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::BadRequest(IMAGE_TOO_LARGE.to_string()));
    }

    Ok(ImageUpload {
        bytes: bytes.to_vec(),
        file_name,
        content_type,
    })
}

/// Read the `name` and `image` fields; other fields are ignored.
async fn read_form(mut multipart: Multipart) -> Result<ConnectForm> {
    let mut form = ConnectForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        match field.name() {
            Some("name") if form.name.is_none() => {
                form.name = Some(field.text().await.map_err(|e| multipart_error(&e))?);
            }
            Some("image") if form.image.is_none() => {
                form.image = Some(read_image(field).await?);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Submit a name and photo for moderation.
///
/// POST /api/connect
///
/// Everything is validated before the photo is uploaded. If the record
/// cannot be stored afterwards, the uploaded photo is destroyed again.
#[instrument(skip_all)]
pub async fn connect(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse> {
    let multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "Rejected non-multipart submission");
        AppError::BadRequest(MALFORMED_BODY.to_string())
    })?;
    let form = read_form(multipart).await?;

    let image = form
        .image
        .ok_or_else(|| AppError::BadRequest(MISSING_IMAGE.to_string()))?;
    let name = DisplayName::parse(form.name.as_deref().unwrap_or_default()).map_err(|e| {
        AppError::BadRequest(
            match e {
                DisplayNameError::Empty => MISSING_NAME,
                DisplayNameError::TooLong { .. } => NAME_TOO_LONG,
            }
            .to_string(),
        )
    })?;

    let hosted = state.images().upload(image).await?;

    let new = NewSubmission {
        name,
        image_url: hosted.url.clone(),
    };
    let submission = match state.store().create(new).await {
        Ok(submission) => submission,
        Err(e) => {
            if let Err(cleanup) = state.images().destroy(&hosted.url).await {
                tracing::error!(
                    error = %cleanup,
                    public_id = %hosted.public_id,
                    "Failed to remove image after store error"
                );
            }
            return Err(e.into());
        }
    };

    tracing::info!(submission_id = %submission.id, "Submission received");

    Ok((
        StatusCode::CREATED,
        Json(ConnectResponse {
            message: "Signal Transmitted",
            node_id: submission.id,
        }),
    ))
}

/// List approved submissions.
///
/// GET /api/users
#[instrument(skip_all)]
pub async fn approved(State(state): State<AppState>) -> Result<Json<Vec<Submission>>> {
    let submissions = state.store().list_approved().await?;
    Ok(Json(submissions))
}
