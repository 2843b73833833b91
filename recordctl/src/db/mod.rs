//! Data access layer.
//!
//! ```text
//! ┌───────────────┐
//! │ RecordService │  (crate::service)
//! └───────┬───────┘
//!         │
//!         ↓
//! ┌───────────────┐
//! │  RecordStore  │  (db::handlers - count, fetch, lookup)
//! └───────┬───────┘
//!         │
//!         ├──────────────────────┐
//!         ↓                      ↓
//! ┌───────────────┐      ┌───────────────┐
//! │  PostgreSQL   │      │   In-memory   │
//! └───────────────┘      └───────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: the [`handlers::RecordStore`] trait and its implementations
//! - [`models`]: database record structures matching table schemas
//! - [`errors`]: store error types
//!
//! # Schema
//!
//! The store reads a single table and never writes to it. Migrations are managed outside
//! this service; the expected shape is:
//!
//! ```sql
//! CREATE TABLE personaldata (
//!     id          INTEGER PRIMARY KEY,
//!     first_name  TEXT NOT NULL,
//!     last_name   TEXT NOT NULL,
//!     email       TEXT NOT NULL,
//!     gender      TEXT NOT NULL,
//!     ip_address  TEXT NOT NULL
//! );
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
