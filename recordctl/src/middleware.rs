//! Request-scoped middleware: timing, response hardening and the catch-all 404.

use std::any::Any;
use std::time::Instant;

use axum::{
    Json, Router,
    extract::Request,
    http::{HeaderName, HeaderValue, StatusCode, Uri, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::SecurityHeadersConfig;
use crate::errors::{Error, ErrorBody};

/// When the request entered the service, inserted as a request extension.
///
/// `at` measures elapsed time; `timestamp` is the wall-clock time reported to clients.
#[derive(Debug, Clone, Copy)]
pub struct RequestStart {
    pub at: Instant,
    pub timestamp: DateTime<Utc>,
}

impl RequestStart {
    pub fn now() -> Self {
        Self {
            at: Instant::now(),
            timestamp: Utc::now(),
        }
    }
}

pub async fn request_timer(mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(RequestStart::now());
    next.run(request).await
}

const HARDENING_HEADERS: [(HeaderName, &str); 9] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "SAMEORIGIN"),
    (header::REFERRER_POLICY, "no-referrer"),
    (header::X_DNS_PREFETCH_CONTROL, "off"),
    (header::X_XSS_PROTECTION, "0"),
    (HeaderName::from_static("x-download-options"), "noopen"),
    (HeaderName::from_static("x-permitted-cross-domain-policies"), "none"),
    (HeaderName::from_static("cross-origin-opener-policy"), "same-origin"),
    (HeaderName::from_static("origin-agent-cluster"), "?1"),
];

const HSTS: &str = "max-age=15552000; includeSubDomains";

/// Add hardening headers to every response that doesn't already set them.
pub fn with_security_headers<S>(mut router: Router<S>, config: &SecurityHeadersConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if !config.enabled {
        return router;
    }

    for (name, value) in HARDENING_HEADERS {
        router = router.layer(SetResponseHeaderLayer::if_not_present(name, HeaderValue::from_static(value)));
    }
    if config.hsts {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS),
        ));
    }

    router
}

/// JSON 500 for a handler that panicked.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("non-string panic payload");
    tracing::error!(panic = detail, "Request handler panicked");

    let body = ErrorBody {
        status: "error".to_string(),
        message: "Something went wrong!".to_string(),
        error: None,
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Fallback for unmatched routes.
pub async fn not_found(uri: Uri) -> Error {
    Error::NotFound {
        resource: "Resource".to_string(),
        id: uri.path().to_string(),
    }
}
