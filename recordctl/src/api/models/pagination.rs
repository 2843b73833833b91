//! Paginated list envelope.
//!
//! Listing endpoints return the page of items alongside the counts a client needs to render
//! pagination controls, plus a `metadata` block echoing how the query was resolved.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::query::{SortDirection, SortField};

/// Generic paginated response wrapper for list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T: ToSchema> {
    /// The items for the current page
    pub result: Vec<T>,
    /// Zero-based page number that was served
    pub page: u64,
    /// Page size that was applied
    pub limit: u64,
    /// Total number of items matching the query (before pagination)
    pub total_rows: u64,
    /// `ceil(totalRows / limit)`
    pub total_pages: u64,
    pub metadata: ListMetadata,
}

/// How a listing request was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListMetadata {
    /// When the response was produced (RFC 3339, UTC)
    pub timestamp: String,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    /// The search term that was applied
    pub query: String,
    /// Time spent on the request, e.g. `12ms`
    pub execution_time: String,
}

impl ListMetadata {
    pub fn new(sort_field: SortField, sort_direction: SortDirection, query: String, execution_time_ms: u64, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            sort_field,
            sort_direction,
            query,
            execution_time: format_execution_time(execution_time_ms),
        }
    }
}

pub fn format_execution_time(ms: u64) -> String {
    format!("{ms}ms")
}
