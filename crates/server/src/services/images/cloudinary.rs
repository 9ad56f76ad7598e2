//! Cloudinary upload API client.
//!
//! Requests are signed: parameters sorted by name, joined as `k=v&k=v`, the
//! API secret appended, and the result hashed with SHA-256. Cloudinary checks
//! SHA-1 signatures unless the account's signature algorithm is set to
//! SHA-256, so the account must be switched before uploads will succeed.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::instrument;
use url::Url;

use super::{DestroyOutcome, HostedImage, ImageHost, ImageHostError, ImageUpload};
use crate::config::CloudinaryConfig;

/// Cloudinary API base URL.
const BASE_URL: &str = "https://api.cloudinary.com/v1_1";

/// Incoming transformation applied to every upload: 300x300 face-centred thumbnail.
const UPLOAD_TRANSFORMATION: &str = "c_thumb,g_face,h_300,w_300";

/// Stored format for every upload.
const UPLOAD_FORMAT: &str = "png";

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// Cloudinary client for uploading and destroying submission photos.
#[derive(Clone)]
pub struct CloudinaryClient {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: SecretString,
    folder: String,
}

impl std::fmt::Debug for CloudinaryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryClient")
            .field("cloud_name", &self.cloud_name)
            .field("folder", &self.folder)
            .field("api_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl CloudinaryClient {
    /// Create a new Cloudinary client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CloudinaryConfig) -> Result<Self, ImageHostError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            folder: config.folder.clone(),
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{BASE_URL}/{}/image/{action}", self.cloud_name)
    }

    /// Build a signed multipart form from the given parameters.
    fn signed_form(&self, params: &[(&str, String)]) -> Form {
        let signature = sign(params, self.api_secret.expose_secret());

        params
            .iter()
            .fold(Form::new(), |form, (key, value)| {
                form.text((*key).to_string(), value.clone())
            })
            .text("api_key", self.api_key.clone())
            .text("signature", signature)
    }

    async fn send(&self, action: &str, form: Form) -> Result<reqwest::Response, ImageHostError> {
        let response = self
            .client
            .post(self.endpoint(action))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ImageHostError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl ImageHost for CloudinaryClient {
    #[instrument(
        skip(self, image),
        fields(size = image.bytes.len(), content_type = %image.content_type)
    )]
    async fn upload(&self, image: ImageUpload) -> Result<HostedImage, ImageHostError> {
        let params = [
            ("folder", self.folder.clone()),
            ("format", UPLOAD_FORMAT.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
            ("transformation", UPLOAD_TRANSFORMATION.to_string()),
        ];

        let file = Part::bytes(image.bytes)
            .file_name(image.file_name.unwrap_or_else(|| "upload".to_string()))
            .mime_str(&image.content_type)?;
        let form = self.signed_form(&params).part("file", file);

        let uploaded: UploadResponse = self
            .send("upload", form)
            .await?
            .json()
            .await
            .map_err(|e| ImageHostError::Parse(e.to_string()))?;

        let url = Url::parse(&uploaded.secure_url)
            .map_err(|e| ImageHostError::Parse(format!("invalid secure_url: {e}")))?;

        tracing::info!(public_id = %uploaded.public_id, "Image uploaded");

        Ok(HostedImage {
            url,
            public_id: uploaded.public_id,
        })
    }

    #[instrument(skip(self), fields(url = %image_url))]
    async fn destroy(&self, image_url: &Url) -> Result<DestroyOutcome, ImageHostError> {
        let public_id = public_id_from_url(image_url)
            .ok_or_else(|| ImageHostError::UnrecognizedUrl(image_url.to_string()))?;

        let params = [
            ("public_id", public_id.clone()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ];

        let destroyed: DestroyResponse = self
            .send("destroy", self.signed_form(&params))
            .await?
            .json()
            .await
            .map_err(|e| ImageHostError::Parse(e.to_string()))?;

        match destroyed.result.as_str() {
            "ok" => {
                tracing::info!(%public_id, "Image destroyed");
                Ok(DestroyOutcome::Deleted)
            }
            "not found" => Ok(DestroyOutcome::NotFound),
            other => Err(ImageHostError::Parse(format!(
                "unexpected destroy result: {other}"
            ))),
        }
    }
}

/// Compute the request signature for a set of parameters.
fn sign(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Derive a Cloudinary public id from a delivery URL.
///
/// `https://res.cloudinary.com/demo/image/upload/v1712/orbit_users/abc.png`
/// yields `orbit_users/abc`. Returns `None` if the URL has no `/upload/`
/// segment or nothing after it.
#[must_use]
pub fn public_id_from_url(url: &Url) -> Option<String> {
    let path = url.path();
    let (_, rest) = path.split_once("/upload/")?;

    let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();
    if segments.first().is_some_and(|s| {
        s.strip_prefix('v')
            .is_some_and(|d| !d.is_empty() && d.bytes().all(|b| b.is_ascii_digit()))
    }) {
        segments.remove(0);
    }

    let last = segments.pop()?;
    let stem = last.rsplit_once('.').map_or(last, |(stem, _)| stem);
    if stem.is_empty() {
        return None;
    }
    segments.push(stem);

    Some(segments.join("/"))
}
