//! Admin session handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::auth::{ADMIN_TOKEN_COOKIE, cookie_value, login_cookies};
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Login request body.
///
/// Missing fields count as empty strings so they fail as bad credentials.
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub success: bool,
    pub token: String,
}

/// Exchange admin credentials for a token.
///
/// The token is returned in the body and set as the `admin_token` cookie,
/// alongside a script-readable `is_admin` hint cookie.
///
/// POST /api/admin/login
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(request) = body.map_err(|e| {
        tracing::debug!(error = %e, "Rejected login body");
        AuthError::InvalidCredentials
    })?;

    let issued = state.gateway().login(&request.username, &request.password)?;

    let [session, hint] = login_cookies(&issued.token, state.config().cookie_secure);
    let session = HeaderValue::from_str(&session.to_string())
        .map_err(|e| AuthError::TokenIssue(format!("unencodable cookie: {e}")))?;
    let hint = HeaderValue::from_str(&hint.to_string())
        .map_err(|e| AuthError::TokenIssue(format!("unencodable cookie: {e}")))?;

    add_breadcrumb("auth", "admin login", None);

    Ok((
        AppendHeaders([(SET_COOKIE, session), (SET_COOKIE, hint)]),
        Json(LoginResponse {
            message: "Access Granted",
            success: true,
            token: issued.token,
        }),
    ))
}

/// Report whether the session cookie holds a valid token.
///
/// Only the cookie is consulted; a bearer header does not count here.
///
/// GET /api/admin/verify
#[instrument(skip_all)]
pub async fn verify(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let authenticated = cookie_value(&headers, ADMIN_TOKEN_COOKIE)
        .is_some_and(|token| state.gateway().verify(&token).is_ok());

    let status = if authenticated {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    };

    (status, Json(json!({ "authenticated": authenticated }))).into_response()
}
