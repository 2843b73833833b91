//! # recordctl: read API over personal records
//!
//! `recordctl` serves one tabular dataset of personal records (`id`, `first_name`,
//! `last_name`, `email`, `gender`, `ip_address`) through a searchable, sortable, paginated
//! HTTP API, plus a capped bulk export.
//!
//! ## Architecture
//!
//! The HTTP layer is [Axum](https://github.com/tokio-rs/axum). Records come from either an
//! external PostgreSQL database (via `sqlx`) or an in-memory store seeded from JSON.
//!
//! ### Request Flow
//!
//! 1. Middleware stamps the request start time, applies the per-client rate limit, CORS and
//!    response hardening headers.
//! 2. The handler turns the raw query string into a validated descriptor ([`query`]). Bad
//!    pagination or sort input is normalized, never rejected.
//! 3. [`service::RecordService`] runs the descriptor against a [`db::handlers::RecordStore`]:
//!    a count and a page fetch for listings, a single capped fetch for exports.
//! 4. The result is wrapped into the JSON envelope ([`api::models`]); failures map to status
//!    codes in [`errors`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use recordctl::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = recordctl::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     recordctl::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     }).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod limits;
pub mod middleware;
mod openapi;
pub mod query;
pub mod service;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use axum::{
    Json, Router,
    http::{HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
};
use bon::Builder;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub use config::Config;
use config::{CorsConfig, CorsOrigin, DatabaseConfig, PoolSettings};
use db::handlers::{InMemoryRecords, RecordStore, Records};
use limits::Limiters;
use openapi::ApiDoc;
use service::RecordService;
pub use types::RecordId;

/// Shared state handed to every handler.
///
/// ```ignore
/// let state = AppState::builder()
///     .records(RecordService::new(store))
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub records: RecordService,
    pub config: Config,
    /// Process start, reported as uptime by the health probe
    #[builder(default = Instant::now())]
    pub started_at: Instant,
}

/// Open the configured record store.
///
/// Returns the store and, for PostgreSQL, the pool so it can be closed on shutdown.
async fn setup_store(config: &Config) -> anyhow::Result<(Arc<dyn RecordStore>, Option<PgPool>)> {
    match &config.database {
        DatabaseConfig::External { url, pool } => {
            let pool = pool_options(pool)
                .connect(url)
                .await
                .context("Failed to connect to database")?;
            info!("Connected to PostgreSQL record store");
            Ok((Arc::new(Records::new(pool.clone())), Some(pool)))
        }
        DatabaseConfig::InMemory { seed_file } => {
            let store = match seed_file {
                Some(path) => InMemoryRecords::from_seed_file(path)?,
                None => InMemoryRecords::default(),
            };
            info!("Using in-memory record store with {} records", store.len().await);
            Ok((Arc::new(store), None))
        }
    }
}

fn pool_options(settings: &PoolSettings) -> PgPoolOptions {
    let non_zero = |secs: u64| (secs > 0).then(|| Duration::from_secs(secs));

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(non_zero(settings.idle_timeout_secs))
        .max_lifetime(non_zero(settings.max_lifetime_secs))
}

fn create_cors_layer(config: &CorsConfig) -> anyhow::Result<CorsLayer> {
    // A wildcard reflects the caller's origin so it stays valid alongside credentials
    let allow_origin = if config.allowed_origins.iter().any(|o| matches!(o, CorsOrigin::Wildcard)) {
        AllowOrigin::mirror_request()
    } else {
        let mut origins = Vec::new();
        for origin in &config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(origins)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_credentials(config.allow_credentials);

    if let Some(max_age) = config.max_age {
        cors = cors.max_age(Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// Layers, innermost first: panic handler, rate limiter, compression, security headers,
/// CORS, tracing, request timer.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let config = state.config.clone();

    let api_routes = Router::new()
        .route("/personal", get(api::handlers::records::list_records))
        .route("/personal/export", get(api::handlers::records::export_records))
        .route("/personal/export/list", get(api::handlers::records::export_records))
        .route("/personal/{id}", get(api::handlers::records::get_record));

    let mut router = Router::new()
        .route("/health", get(api::handlers::health::health))
        .nest("/api", api_routes)
        .with_state(state)
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .fallback(middleware::not_found)
        .layer(CatchPanicLayer::custom(middleware::panic_response));

    if let Some(limiter) = Limiters::new(&config.security.rate_limit).requests {
        router = router.layer(from_fn_with_state(limiter, limits::rate_limit));
    }

    if config.enable_compression {
        router = router.layer(CompressionLayer::new());
    }

    let router = middleware::with_security_headers(router, &config.security.headers)
        .layer(create_cors_layer(&config.security.cors)?)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(from_fn(middleware::request_timer));

    Ok(router)
}

/// The HTTP service with its store connections.
pub struct Application {
    router: Router,
    config: Config,
    pool: Option<PgPool>,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting record service with configuration: {:#?}", config);

        let (store, pool) = setup_store(&config).await?;
        Self::with_store(config, store, pool)
    }

    /// Build the application around an already-open store.
    pub fn with_store(config: Config, store: Arc<dyn RecordStore>, pool: Option<PgPool>) -> anyhow::Result<Self> {
        let app_state = AppState::builder()
            .records(RecordService::new(store))
            .config(config.clone())
            .build();

        let router = build_router(app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Record service listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // Peer addresses feed the rate limiter
        axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await?;

        if let Some(pool) = self.pool {
            info!("Closing database connections...");
            pool.close().await;
        }

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::{RateLimitConfig, SecurityHeadersConfig};
    use crate::test_utils::{create_test_config, sample_records};
    use axum::http::{StatusCode, header};
    use serde_json::json;

    fn server_with(config: Config, records: usize) -> axum_test::TestServer {
        Application::with_store(config, Arc::new(InMemoryRecords::new(sample_records(records))), None)
            .unwrap()
            .into_test_server()
    }

    #[test_log::test(tokio::test)]
    async fn test_unknown_route_returns_json_404() {
        let server = server_with(create_test_config(), 1);

        let response = server.get("/api/unknown").await;

        response.assert_status_not_found();
        response.assert_json(&json!({ "status": "error", "message": "Resource not found" }));
    }

    #[test_log::test(tokio::test)]
    async fn test_rate_limit_rejects_after_budget() {
        let mut config = create_test_config();
        config.security.rate_limit = RateLimitConfig {
            enabled: true,
            window: Duration::from_secs(900),
            max_requests: 2,
        };
        let server = server_with(config, 3);

        let first = server.get("/api/personal").await;
        first.assert_status_ok();
        assert_eq!(first.header("ratelimit-limit"), "2");
        assert_eq!(first.header("ratelimit-remaining"), "1");

        server.get("/health").await.assert_status_ok();

        let limited = server.get("/api/personal/1").await;
        limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
        limited.assert_json(&json!({ "status": 429, "message": "Too many requests, please try again later." }));
        assert_eq!(limited.header("ratelimit-remaining"), "0");
        assert!(limited.headers().get(header::RETRY_AFTER).is_some());
    }

    #[test_log::test(tokio::test)]
    async fn test_rate_limit_disabled() {
        let mut config = create_test_config();
        config.security.rate_limit.enabled = false;
        let server = server_with(config, 1);

        for _ in 0..5 {
            let response = server.get("/health").await;
            response.assert_status_ok();
            assert!(response.headers().get("ratelimit-limit").is_none());
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_security_headers() {
        let server = server_with(create_test_config(), 1);

        let response = server.get("/api/personal").await;

        assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");
        assert_eq!(response.header(header::X_FRAME_OPTIONS), "SAMEORIGIN");
        assert!(response.headers().get(header::STRICT_TRANSPORT_SECURITY).is_some());

        let mut config = create_test_config();
        config.security.headers = SecurityHeadersConfig {
            enabled: false,
            hsts: true,
        };
        let response = server_with(config, 1).get("/api/personal").await;
        assert!(response.headers().get(header::X_CONTENT_TYPE_OPTIONS).is_none());
    }

    #[test_log::test(tokio::test)]
    async fn test_cors_reflects_origin() {
        let server = server_with(create_test_config(), 1);

        let response = server
            .get("/api/personal")
            .add_header(header::ORIGIN, "https://frontend.example.com")
            .await;

        assert_eq!(
            response.header(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            "https://frontend.example.com"
        );
        assert_eq!(response.header(header::ACCESS_CONTROL_ALLOW_CREDENTIALS), "true");
    }

    #[test_log::test(tokio::test)]
    async fn test_listing_cap_from_config() {
        let mut config = create_test_config();
        config.listing.max_limit = Some(5);
        let server = server_with(config, 20);

        let body: serde_json::Value = server.get("/api/personal").add_query_param("limit", "50").await.json();

        assert_eq!(body["limit"], 5);
        assert_eq!(body["result"].as_array().map(Vec::len), Some(5));
        assert_eq!(body["totalPages"], 4);
    }

    struct PanickingStore;

    #[async_trait::async_trait]
    impl RecordStore for PanickingStore {
        async fn count(&self, _search: &query::SearchFilter) -> db::errors::Result<u64> {
            panic!("count exploded")
        }

        async fn fetch(&self, _filter: &db::handlers::RecordFilter) -> db::errors::Result<Vec<db::models::records::RecordDBResponse>> {
            panic!("fetch exploded")
        }

        async fn get_by_id(&self, _id: RecordId) -> db::errors::Result<Option<db::models::records::RecordDBResponse>> {
            panic!("get_by_id exploded")
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_panicking_handler_returns_json_500() {
        let server = Application::with_store(create_test_config(), Arc::new(PanickingStore), None)
            .unwrap()
            .into_test_server();

        let response = server.get("/api/personal").await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        response.assert_json(&json!({ "status": "error", "message": "Something went wrong!" }));
        assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");
    }

    #[test_log::test(tokio::test)]
    async fn test_listing_timestamp_is_request_time() {
        let server = server_with(create_test_config(), 3);

        let before = chrono::Utc::now();
        let body: serde_json::Value = server.get("/api/personal").await.json();
        let after = chrono::Utc::now();

        let timestamp = chrono::DateTime::parse_from_rfc3339(body["metadata"]["timestamp"].as_str().unwrap())
            .unwrap()
            .with_timezone(&chrono::Utc);
        // Millisecond precision on the wire
        assert!(timestamp >= before - chrono::Duration::milliseconds(1));
        assert!(timestamp <= after);
    }

    #[test_log::test(tokio::test)]
    async fn test_openapi_json_served() {
        let server = server_with(create_test_config(), 0);

        let response = server.get("/api-docs/openapi.json").await;

        response.assert_status_ok();
        let doc: serde_json::Value = response.json();
        assert!(doc["paths"].get("/api/personal").is_some());
    }

    #[test]
    fn test_cors_layer_accepts_configured_urls() {
        let config = CorsConfig {
            allowed_origins: vec![CorsOrigin::Url("https://records.example.com".parse().unwrap())],
            allow_credentials: false,
            max_age: None,
        };
        assert!(create_cors_layer(&config).is_ok());
    }

    #[tokio::test]
    async fn test_setup_in_memory_store_from_seed() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let records: Vec<_> = sample_records(4);
        write!(file, "{}", serde_json::to_string(&records).unwrap()).unwrap();

        let mut config = create_test_config();
        config.database = DatabaseConfig::InMemory {
            seed_file: Some(file.path().to_path_buf()),
        };

        let (store, pool) = setup_store(&config).await.unwrap();
        assert!(pool.is_none());
        assert_eq!(store.count(&Default::default()).await.unwrap(), 4);
    }
}
