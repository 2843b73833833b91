//! Request rate limiting.
//!
//! A fixed-window counter per client address. When a client exceeds its budget the request is
//! answered with HTTP 429 without reaching a handler. Every response carries the standard
//! `RateLimit-*` headers so clients can pace themselves.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, header::RETRY_AFTER},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::errors::Error;

/// Above this many tracked clients, expired windows are swept on the next check.
const SWEEP_THRESHOLD: usize = 10_000;

static RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");
static RATELIMIT_RESET: HeaderName = HeaderName::from_static("ratelimit-reset");
static RATELIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");

/// Container for all resource limiters.
#[derive(Debug, Default, Clone)]
pub struct Limiters {
    /// Per-client request budget. None means unlimited.
    pub requests: Option<Arc<RateLimiter>>,
}

impl Limiters {
    /// Creates all limiters from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            requests: RateLimiter::new(config).map(Arc::new),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Outcome of counting one request against a client's window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Seconds until the client's window resets
    pub reset_secs: u64,
    window_secs: u64,
}

impl Decision {
    fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(RATELIMIT_LIMIT.clone(), HeaderValue::from(self.limit));
        headers.insert(RATELIMIT_REMAINING.clone(), HeaderValue::from(self.remaining));
        headers.insert(RATELIMIT_RESET.clone(), HeaderValue::from(self.reset_secs));
        if let Ok(policy) = HeaderValue::from_str(&format!("{};w={}", self.limit, self.window_secs)) {
            headers.insert(RATELIMIT_POLICY.clone(), policy);
        }
        if !self.allowed {
            headers.insert(RETRY_AFTER, HeaderValue::from(self.reset_secs));
        }
    }
}

/// Fixed-window request counter keyed by client IP.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    clients: DashMap<IpAddr, Window>,
}

impl RateLimiter {
    /// Returns `None` when rate limiting is disabled.
    pub fn new(config: &RateLimitConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        Some(Self {
            window: config.window,
            max_requests: config.max_requests,
            clients: DashMap::new(),
        })
    }

    /// Count a request from `client` at `now`.
    pub fn check(&self, client: IpAddr, now: Instant) -> Decision {
        let window = {
            let mut entry = self.clients.entry(client).or_insert(Window { started: now, count: 0 });
            if now.saturating_duration_since(entry.started) >= self.window {
                *entry = Window { started: now, count: 0 };
            }
            entry.count = entry.count.saturating_add(1);
            *entry
        };

        if self.clients.len() > SWEEP_THRESHOLD {
            self.clients
                .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        }

        let reset_in = (window.started + self.window).saturating_duration_since(now);
        Decision {
            allowed: window.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.count),
            reset_secs: reset_in.as_secs() + u64::from(reset_in.subsec_nanos() > 0),
            window_secs: self.window.as_secs(),
        }
    }
}

/// The peer address when the server was started with connect info, otherwise a shared bucket.
fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

/// Axum middleware enforcing [`RateLimiter`].
pub async fn rate_limit(State(limiter): State<Arc<RateLimiter>>, request: Request, next: Next) -> Response {
    let client = client_ip(&request);
    let decision = limiter.check(client, Instant::now());

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::debug!(%client, "Request budget exhausted");
        Error::TooManyRequests.into_response()
    };

    decision.apply_headers(response.headers_mut());
    response
}
