//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ORBIT_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`, then `DB_URL`)
//! - `ADMIN_USERNAME` - The single admin identity
//! - `ADMIN_PASSWORD_HASH` - Argon2 PHC hash of the admin password
//!   (generate with `orbit-cli hash-password`)
//! - `JWT_SECRET` - Token signing secret (min 32 chars, high entropy)
//! - `CLOUDINARY_NAME` - Cloudinary cloud name
//! - `CLOUDINARY_KEY` - Cloudinary API key
//! - `CLOUDINARY_SECRET` - Cloudinary API secret
//! - `FRONTEND_URL` - Origin allowed to make credentialed CORS requests
//!
//! ## Optional
//! - `ORBIT_HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 5000)
//! - `ORBIT_COOKIE_SECURE` - Mark auth cookies `Secure; SameSite=None` (default: true)
//! - `ORBIT_UPLOADS_PER_HOUR` - Submissions allowed per client per hour (default: 3)
//! - `CLOUDINARY_FOLDER` - Folder uploaded images are stored in (default: `orbit_users`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;

use argon2::password_hash::PasswordHash;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Frontend origin allowed by CORS
    pub frontend_url: String,
    /// Whether auth cookies are sent cross-site (`Secure; SameSite=None`)
    pub cookie_secure: bool,
    /// Submissions allowed per client per hour
    pub uploads_per_hour: NonZeroU32,
    /// Admin identity and credentials
    pub admin: AdminConfig,
    /// Cloudinary image hosting
    pub cloudinary: CloudinaryConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Admin credentials and token signing secret.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct AdminConfig {
    /// Admin username, compared exactly on login
    pub username: String,
    /// Argon2 PHC string for the admin password
    pub password_hash: SecretString,
    /// HMAC secret used to sign session tokens
    pub jwt_secret: SecretString,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .finish()
    }
}

/// Cloudinary API configuration.
///
/// Requests are signed with SHA-256, so the account's signature algorithm
/// must be set to SHA-256 in the Cloudinary console. Accounts left on the
/// default SHA-1 reject every upload with 401.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct CloudinaryConfig {
    /// Cloud name (first path segment of every API URL)
    pub cloud_name: String,
    /// API key (sent with every signed request)
    pub api_key: String,
    /// API secret (used to sign requests, never sent)
    pub api_secret: SecretString,
    /// Folder uploaded images are placed in
    pub folder: String,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"[REDACTED]")
            .field("folder", &self.folder)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ORBIT_DATABASE_URL")?;
        let host = parse_env("ORBIT_HOST", "0.0.0.0")?;
        let port = parse_env("PORT", "5000")?;
        let frontend_url = parse_origin("FRONTEND_URL", &get_required_env("FRONTEND_URL")?)?;
        let cookie_secure = parse_env("ORBIT_COOKIE_SECURE", "true")?;
        let uploads_per_hour = parse_env("ORBIT_UPLOADS_PER_HOUR", "3")?;

        let admin = AdminConfig::from_env()?;
        let cloudinary = CloudinaryConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            frontend_url,
            cookie_secure,
            uploads_per_hour,
            admin,
            cloudinary,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl AdminConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let username = get_required_env("ADMIN_USERNAME")?;
        if username.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "ADMIN_USERNAME".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let password_hash = get_required_secret("ADMIN_PASSWORD_HASH")?;
        validate_password_hash(&password_hash, "ADMIN_PASSWORD_HASH")?;

        let jwt_secret = get_validated_secret("JWT_SECRET")?;
        validate_jwt_secret(&jwt_secret, "JWT_SECRET")?;

        Ok(Self {
            username,
            password_hash,
            jwt_secret,
        })
    }
}

impl CloudinaryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cloud_name: get_required_env("CLOUDINARY_NAME")?,
            api_key: get_required_env("CLOUDINARY_KEY")?,
            api_secret: get_validated_secret("CLOUDINARY_SECRET")?,
            folder: get_env_or_default("CLOUDINARY_FOLDER", "orbit_users"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get a required environment variable as a secret.
fn get_required_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    Ok(SecretString::from(value))
}

/// Get database URL, falling back to the generic names hosting providers set.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    for key in [primary_key, "DATABASE_URL", "DB_URL"] {
        if let Ok(value) = std::env::var(key) {
            return Ok(SecretString::from(value));
        }
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Reduce a URL to its origin (`scheme://host[:port]`), as browsers send it.
fn parse_origin(key: &str, value: &str) -> Result<String, ConfigError> {
    let url = url::Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }

    Ok(origin.ascii_serialization())
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) into `T`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that the token signing secret meets minimum length requirements.
fn validate_jwt_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Validate that the admin password hash is an Argon2 PHC string.
fn validate_password_hash(hash: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let parsed = PasswordHash::new(hash.expose_secret())
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;

    if !parsed.algorithm.as_str().starts_with("argon2") {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!(
                "expected an argon2 hash, got '{}' (generate one with `orbit-cli hash-password`)",
                parsed.algorithm
            ),
        ));
    }

    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
