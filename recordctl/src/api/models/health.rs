//! Liveness probe response.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always `ok`
    pub status: String,
    /// Seconds since the service started
    pub uptime: f64,
    /// RFC 3339 timestamp of the check
    pub timestamp: String,
}
