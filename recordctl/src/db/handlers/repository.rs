//! Store trait for record reads.

use crate::db::{errors::Result, models::records::RecordDBResponse};
use crate::query::{SearchFilter, SortOrder};
use crate::types::RecordId;

/// Filter for fetching records
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub skip: u64,
    pub limit: u64,
    pub search: SearchFilter,
    pub order: SortOrder,
}

impl RecordFilter {
    pub fn new(skip: u64, limit: u64) -> Self {
        Self {
            skip,
            limit,
            ..Default::default()
        }
    }

    pub fn with_search(mut self, search: SearchFilter) -> Self {
        self.search = search;
        self
    }

    pub fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

/// Read-only access to the record table.
///
/// Implementations must apply [`SearchFilter`] identically in `count` and `fetch` so that a
/// page's `total_rows` describes the same set the page was cut from.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Number of records matching the search
    async fn count(&self, search: &SearchFilter) -> Result<u64>;

    /// Matching records, ordered, then offset by `skip` and truncated to `limit`
    async fn fetch(&self, filter: &RecordFilter) -> Result<Vec<RecordDBResponse>>;

    /// Get a record by ID
    async fn get_by_id(&self, id: RecordId) -> Result<Option<RecordDBResponse>>;
}
