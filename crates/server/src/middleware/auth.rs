//! Admin authentication extractor and session cookies.
//!
//! Admin requests carry their token either in the `admin_token` cookie (set
//! at login) or in an `Authorization: Bearer` header for clients that cannot
//! keep third-party cookies.

use axum::{
    extract::FromRequestParts,
    http::{
        HeaderMap,
        header::{AUTHORIZATION, COOKIE},
        request::Parts,
    },
};
use cookie::{Cookie, SameSite};

use crate::error::AppError;
use crate::services::auth::{AdminClaims, TOKEN_TTL_HOURS};
use crate::state::AppState;

/// Cookie holding the signed admin token.
pub const ADMIN_TOKEN_COOKIE: &str = "admin_token";

/// Script-readable hint that an admin session exists.
pub const IS_ADMIN_COOKIE: &str = "is_admin";

/// Read a cookie value by name from all `Cookie` headers.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

/// Bearer token from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
}

/// Admin token from the cookie, falling back to the bearer header.
#[must_use]
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, ADMIN_TOKEN_COOKIE).or_else(|| bearer_token(headers))
}

/// Extractor that requires a valid admin token.
///
/// # Example
///
/// ```rust,ignore
/// async fn pending(RequireAdmin(_claims): RequireAdmin) -> impl IntoResponse {
///     // only reached with a valid token
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AdminClaims);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers);
        let claims = state.gateway().guard(token.as_deref())?;

        sentry::configure_scope(|scope| {
            scope.set_tag("admin", "true");
        });

        Ok(Self(claims))
    }
}

/// Build the two cookies set on a successful login.
///
/// With `secure` they are `Secure; SameSite=None` so a frontend on another
/// site still receives them; without it they fall back to `SameSite=Lax` for
/// plain-HTTP local development.
#[must_use]
pub fn login_cookies(token: &str, secure: bool) -> [Cookie<'static>; 2] {
    let same_site = if secure { SameSite::None } else { SameSite::Lax };
    let max_age = time::Duration::hours(TOKEN_TTL_HOURS);

    let session = Cookie::build((ADMIN_TOKEN_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(same_site)
        .max_age(max_age)
        .build();

    let hint = Cookie::build((IS_ADMIN_COOKIE, "true"))
        .path("/")
        .http_only(false)
        .secure(secure)
        .same_site(same_site)
        .max_age(max_age)
        .build();

    [session, hint]
}
