//! API request and response models.
//!
//! These types define the JSON wire format and are kept separate from the database models in
//! [`crate::db::models`]; conversions live next to the API types.

pub mod health;
pub mod pagination;
pub mod records;
