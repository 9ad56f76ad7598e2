//! Integration tests for Orbit.
//!
//! Each test starts the real router on an ephemeral local port, backed by
//! the in-memory submission store and image host, and talks to it over HTTP
//! with `reqwest`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p orbit-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]

use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use secrecy::SecretString;

use orbit_server::AppState;
use orbit_server::config::{AdminConfig, CloudinaryConfig, ServerConfig};
use orbit_server::db::MemorySubmissionStore;
use orbit_server::services::auth::hash_password;
use orbit_server::services::images::MemoryImageHost;

/// Admin username configured for every test server.
pub const ADMIN_USERNAME: &str = "orbit-admin";

/// Admin password configured for every test server.
pub const ADMIN_PASSWORD: &str = "n0t-a-real-admin-password";

/// Frontend origin configured for CORS.
pub const FRONTEND_ORIGIN: &str = "http://localhost:5173";

/// A running server and handles to its in-memory backends.
pub struct TestContext {
    /// Base URL, e.g. `http://127.0.0.1:49152`.
    pub base_url: String,
    /// Client with a cookie jar, so login cookies stick.
    pub client: Client,
    /// Shared application state.
    pub state: AppState,
    /// Submission store behind the server.
    pub store: Arc<MemorySubmissionStore>,
    /// Image host behind the server.
    pub images: Arc<MemoryImageHost>,
}

/// Configuration for a local test server.
///
/// Cookies are not `Secure` because the test server speaks plain HTTP.
#[must_use]
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://unused"),
        host: "127.0.0.1".parse().expect("valid ip"),
        port: 0,
        frontend_url: FRONTEND_ORIGIN.to_string(),
        cookie_secure: false,
        uploads_per_hour: NonZeroU32::new(3).expect("non-zero"),
        admin: AdminConfig {
            username: ADMIN_USERNAME.to_string(),
            password_hash: SecretString::from(
                hash_password(ADMIN_PASSWORD).expect("hashing succeeds"),
            ),
            jwt_secret: SecretString::from("Gv7#pQ2$kW9!mZ4@rT6^xB1&nC8*hL3e"),
        },
        cloudinary: CloudinaryConfig {
            cloud_name: "test".to_string(),
            api_key: "test".to_string(),
            api_secret: SecretString::from("unused"),
            folder: "orbit_users".to_string(),
        },
        sentry_dsn: None,
        sentry_environment: None,
    }
}

impl TestContext {
    /// Start a server on an ephemeral port.
    pub async fn start() -> Self {
        let store = Arc::new(MemorySubmissionStore::new());
        let images = Arc::new(MemoryImageHost::new());
        let state = AppState::new(test_config(), store.clone(), images.clone());
        let app = orbit_server::app(state.clone()).expect("router builds");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("server runs");
        });

        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: format!("http://{addr}"),
            client,
            state,
            store,
            images,
        }
    }

    /// Absolute URL for a path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Submit a name and PNG of `image_size` bytes to `/api/connect`.
    pub async fn connect(&self, name: &str, image_size: usize) -> Response {
        self.client
            .post(self.url("/api/connect"))
            .multipart(submission_form(name, image_size))
            .send()
            .await
            .expect("connect request")
    }

    /// Log in as the configured admin with this context's cookie jar.
    pub async fn login(&self) -> Response {
        self.login_as(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Log in with arbitrary credentials.
    pub async fn login_as(&self, username: &str, password: &str) -> Response {
        self.client
            .post(self.url("/api/admin/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request")
    }
}

/// Multipart body with a `name` field and a fake PNG `image` file.
#[must_use]
pub fn submission_form(name: &str, image_size: usize) -> Form {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.resize(image_size.max(bytes.len()), 0);

    let image = Part::bytes(bytes)
        .file_name("photo.png")
        .mime_str("image/png")
        .expect("valid mime");

    Form::new().text("name", name.to_string()).part("image", image)
}
