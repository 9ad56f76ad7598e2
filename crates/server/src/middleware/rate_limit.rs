//! Per-client upload quota using governor.
//!
//! Only `POST /api/connect` is limited. Each client IP may upload
//! `ORBIT_UPLOADS_PER_HOUR` times in a burst, after which one slot comes back
//! per hour, so no rolling hour ever sees more than the quota. Requests over
//! quota are answered with 429 and a `Retry-After` header before the body is
//! read.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    Quota, RateLimiter,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::keyed::DefaultKeyedStateStore,
};

use crate::error::AppError;
use crate::state::AppState;

type KeyedLimiter<C> =
    RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, C, NoOpMiddleware<<C as Clock>::Instant>>;

/// Keyed limiter for submission uploads.
#[derive(Clone)]
pub struct UploadLimiter<C: Clock = DefaultClock> {
    limiter: Arc<KeyedLimiter<C>>,
}

impl<C: Clock> std::fmt::Debug for UploadLimiter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadLimiter")
            .field("tracked_clients", &self.limiter.len())
            .finish()
    }
}

impl UploadLimiter {
    /// Allow `per_hour` uploads per client in any one-hour window.
    #[must_use]
    pub fn per_hour(per_hour: NonZeroU32) -> Self {
        Self::with_clock(per_hour, DefaultClock::default())
    }
}

impl<C: Clock> UploadLimiter<C> {
    /// Same quota as [`UploadLimiter::per_hour`], measured by `clock`.
    #[must_use]
    pub fn with_clock(per_hour: NonZeroU32, clock: C) -> Self {
        let quota = Quota::per_hour(NonZeroU32::MIN).allow_burst(per_hour);
        Self {
            limiter: Arc::new(RateLimiter::dashmap_with_clock(quota, clock)),
        }
    }

    /// Take one upload from `client`'s quota.
    ///
    /// # Errors
    ///
    /// Returns how long the client must wait before the next upload is allowed.
    pub fn check(&self, client: IpAddr) -> Result<(), Duration> {
        self.limiter
            .check_key(&client)
            .map_err(|not_until| not_until.wait_time_from(self.limiter.clock().now()))
    }

    /// Drop buckets that have fully refilled.
    pub fn retain_recent(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }
}

// =============================================================================
// Client IP extraction (Cloudflare + Fly.io)
// =============================================================================

/// Client IP from proxy headers, checking Cloudflare's `CF-Connecting-IP`
/// first, then standard proxy headers.
#[must_use]
pub fn client_ip_from_headers(headers: &HeaderMap) -> Option<IpAddr> {
    // Try CF-Connecting-IP first (Cloudflare's real client IP)
    if let Some(ip) = headers
        .get("cf-connecting-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    // Try X-Forwarded-For (first IP in the chain)
    if let Some(ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
    {
        return Some(ip);
    }

    ["x-real-ip", "fly-client-ip"].into_iter().find_map(|name| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    })
}

/// Client IP for rate limiting: proxy headers, then the socket peer.
///
/// Requests with neither share a single bucket.
fn client_ip(request: &Request) -> IpAddr {
    client_ip_from_headers(request.headers())
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Middleware enforcing the upload quota.
pub async fn upload_rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);

    match state.upload_limiter().check(client) {
        Ok(()) => next.run(request).await,
        Err(wait) => {
            tracing::warn!(%client, retry_after_secs = wait.as_secs(), "Upload quota exceeded");

            let mut response = AppError::RateLimited.into_response();
            // Round up so clients never retry a second early.
            let retry_after = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
            response
        }
    }
}
