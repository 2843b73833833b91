//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! # API Structure
//!
//! - `GET /api/personal`: paginated, searchable, sortable listing
//! - `GET /api/personal/{id}`: single record
//! - `GET /api/personal/export`: capped bulk export (also served at `/api/personal/export/list`)
//! - `GET /health`: liveness
//!
//! # OpenAPI Documentation
//!
//! All endpoints are documented with `utoipa`. Interactive documentation is served at `/docs`
//! and the raw document at `/api-docs/openapi.json`.

pub mod handlers;
pub mod models;
