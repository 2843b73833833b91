//! Database models for personal records.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::query::SortField;
use crate::types::RecordId;

/// One row of the `personaldata` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RecordDBResponse {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub ip_address: String,
}

impl RecordDBResponse {
    /// Value of a text column, `None` for `id`
    pub fn text(&self, field: SortField) -> Option<&str> {
        match field {
            SortField::Id => None,
            SortField::FirstName => Some(&self.first_name),
            SortField::LastName => Some(&self.last_name),
            SortField::Email => Some(&self.email),
            SortField::Gender => Some(&self.gender),
            SortField::IpAddress => Some(&self.ip_address),
        }
    }
}
