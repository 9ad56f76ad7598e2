//! In-process image host.
//!
//! Keeps uploaded bytes in memory and serves them from a fake delivery
//! domain. Used by the test suites and for running without Cloudinary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use super::{
    DestroyOutcome, HostedImage, ImageHost, ImageHostError, ImageUpload, public_id_from_url,
};

/// Delivery prefix for images held by [`MemoryImageHost`].
const DELIVERY_PREFIX: &str = "https://images.orbit.test/image/upload/v1";

/// Image host held in memory.
#[derive(Debug, Default)]
pub struct MemoryImageHost {
    images: RwLock<HashMap<String, ImageUpload>>,
    fail_destroy: AtomicBool,
}

impl MemoryImageHost {
    /// Create an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `destroy` call fail with an API error.
    pub fn fail_destroys(&self, fail: bool) {
        self.fail_destroy.store(fail, Ordering::SeqCst);
    }

    /// Whether an image with this public id is stored.
    pub async fn contains(&self, public_id: &str) -> bool {
        self.images.read().await.contains_key(public_id)
    }

    /// Number of stored images.
    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }

    /// Whether no images are stored.
    pub async fn is_empty(&self) -> bool {
        self.images.read().await.is_empty()
    }
}

#[async_trait]
impl ImageHost for MemoryImageHost {
    async fn upload(&self, image: ImageUpload) -> Result<HostedImage, ImageHostError> {
        let public_id = format!("orbit_users/{}", Uuid::new_v4().simple());
        let url = Url::parse(&format!("{DELIVERY_PREFIX}/{public_id}.png"))
            .map_err(|e| ImageHostError::Parse(e.to_string()))?;

        self.images.write().await.insert(public_id.clone(), image);

        Ok(HostedImage { url, public_id })
    }

    async fn destroy(&self, image_url: &Url) -> Result<DestroyOutcome, ImageHostError> {
        if self.fail_destroy.load(Ordering::SeqCst) {
            return Err(ImageHostError::Api {
                status: 500,
                message: "destroy disabled".to_string(),
            });
        }

        let public_id = public_id_from_url(image_url)
            .ok_or_else(|| ImageHostError::UnrecognizedUrl(image_url.to_string()))?;

        Ok(match self.images.write().await.remove(&public_id) {
            Some(_) => DestroyOutcome::Deleted,
            None => DestroyOutcome::NotFound,
        })
    }
}
