//! External image hosting.
//!
//! Submitted photos never touch local disk: the route hands the bytes to an
//! [`ImageHost`], which returns the public delivery URL stored with the
//! submission. Deleting a submission asks the host to destroy the same URL.

mod cloudinary;
mod memory;

pub use cloudinary::{CloudinaryClient, public_id_from_url};
pub use memory::MemoryImageHost;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Errors that can occur when talking to the image host.
#[derive(Debug, Error)]
pub enum ImageHostError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Host returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body could not be understood.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The URL does not point at an image on this host.
    #[error("unrecognized image url: {0}")]
    UnrecognizedUrl(String),
}

/// An image received from a client, ready to upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Client-supplied file name, if any.
    pub file_name: Option<String>,
    /// MIME type declared by the client (always `image/*` by the time it gets here).
    pub content_type: String,
}

/// An image stored on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    /// Public delivery URL.
    pub url: Url,
    /// Host-side identifier.
    pub public_id: String,
}

/// Result of asking the host to destroy an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    /// The image existed and was removed.
    Deleted,
    /// The host had no such image.
    NotFound,
}

/// Storage for submitted photos.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload an image and return where it is served from.
    async fn upload(&self, image: ImageUpload) -> Result<HostedImage, ImageHostError>;

    /// Remove the image served at `image_url`.
    async fn destroy(&self, image_url: &Url) -> Result<DestroyOutcome, ImageHostError>;
}
