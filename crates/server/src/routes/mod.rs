//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness check
//! GET    /health/ready            - Readiness check (store reachable)
//!
//! # Public
//! POST   /api/connect             - Submit name + photo (multipart, rate limited)
//! GET    /api/users               - Approved submissions
//!
//! # Admin session
//! POST   /api/admin/login         - Exchange credentials for a token + cookies
//! GET    /api/admin/verify        - Check the session cookie
//!
//! # Moderation (requires admin token)
//! GET    /api/admin/pending       - Pending submissions, newest first
//! PATCH  /api/admin/approve/{id}  - Approve a submission
//! DELETE /api/admin/reject/{id}   - Reject (delete) a submission
//! DELETE /api/admin/user/{id}     - Delete a submission and its photo
//! ```

pub mod admin;
pub mod auth;
pub mod health;
pub mod submissions;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{delete, get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::AppError;
use crate::middleware::{
    request_id_middleware, security_headers_middleware, upload_rate_limit_middleware,
};
use crate::state::AppState;

/// Largest accepted photo.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Body limit for `/api/connect`: the photo plus room for the name field and
/// multipart framing.
const CONNECT_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

/// Public submission routes.
pub fn submission_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/connect",
            post(submissions::connect)
                .layer(DefaultBodyLimit::max(CONNECT_BODY_LIMIT))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    upload_rate_limit_middleware,
                )),
        )
        .route("/users", get(submissions::approved))
}

/// Admin session and moderation routes.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/verify", get(auth::verify))
        .route("/pending", get(admin::pending))
        .route("/approve/{id}", patch(admin::approve))
        .route("/reject/{id}", delete(admin::reject))
        .route("/user/{id}", delete(admin::delete_user))
}

/// Everything under `/api`.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(submission_routes(state))
        .nest("/admin", admin_routes())
}

/// CORS policy allowing credentialed requests from the frontend only.
///
/// # Errors
///
/// Returns `AppError::Internal` if the configured origin is not a valid header value.
pub fn cors_layer(frontend_origin: &str) -> Result<CorsLayer, AppError> {
    let origin = HeaderValue::from_str(frontend_origin)
        .map_err(|e| AppError::Internal(format!("invalid frontend origin: {e}")))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true))
}

/// Build the complete application router.
///
/// Sentry layers are added by the binary so tests can drive this router
/// without a Sentry client.
///
/// # Errors
///
/// Returns `AppError::Internal` if the CORS origin is invalid.
pub fn app(state: AppState) -> Result<Router, AppError> {
    let cors = cors_layer(&state.config().frontend_url)?;

    Ok(Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes(&state))
        .layer(cors)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[cfg(test)]
mod tests;
