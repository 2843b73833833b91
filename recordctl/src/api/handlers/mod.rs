//! HTTP request handlers.
//!
//! - [`records`]: listing, lookup and export of personal records
//! - [`health`]: liveness probe

pub mod health;
pub mod records;
