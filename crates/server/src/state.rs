//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::db::SubmissionStore;
use crate::middleware::UploadLimiter;
use crate::services::auth::AdminGateway;
use crate::services::images::ImageHost;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// submission store, image host, admin gateway, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn SubmissionStore>,
    images: Arc<dyn ImageHost>,
    gateway: AdminGateway,
    upload_limiter: UploadLimiter,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - Submission persistence
    /// * `images` - Image host used for submitted photos
    #[must_use]
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn SubmissionStore>,
        images: Arc<dyn ImageHost>,
    ) -> Self {
        let gateway = AdminGateway::new(&config.admin);
        let upload_limiter = UploadLimiter::per_hour(config.uploads_per_hour);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                images,
                gateway,
                upload_limiter,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the submission store.
    #[must_use]
    pub fn store(&self) -> &dyn SubmissionStore {
        self.inner.store.as_ref()
    }

    /// Get a reference to the image host.
    #[must_use]
    pub fn images(&self) -> &dyn ImageHost {
        self.inner.images.as_ref()
    }

    /// Get a reference to the admin gateway.
    #[must_use]
    pub fn gateway(&self) -> &AdminGateway {
        &self.inner.gateway
    }

    /// Get a reference to the upload rate limiter.
    #[must_use]
    pub fn upload_limiter(&self) -> &UploadLimiter {
        &self.inner.upload_limiter
    }
}
