//! In-memory record store.
//!
//! Used for local development (seeded from a JSON file) and as the store behind the HTTP
//! tests. Filtering and ordering follow the same rules as the PostgreSQL repository.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::db::{
    errors::Result,
    handlers::repository::{RecordFilter, RecordStore},
    models::records::RecordDBResponse,
};
use crate::query::{SearchFilter, SortDirection, SortField, SortOrder};
use crate::types::RecordId;

#[derive(Debug, Clone, Default)]
pub struct InMemoryRecords {
    records: Arc<RwLock<Vec<RecordDBResponse>>>,
}

impl InMemoryRecords {
    pub fn new(records: Vec<RecordDBResponse>) -> Self {
        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    /// Load records from a JSON array of objects with the table's column names.
    pub fn from_seed_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read seed file {}", path.display()))?;
        let records: Vec<RecordDBResponse> =
            serde_json::from_str(&raw).with_context(|| format!("Failed to parse seed file {}", path.display()))?;
        tracing::info!("Loaded {} records from {}", records.len(), path.display());
        Ok(Self::new(records))
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl RecordStore for InMemoryRecords {
    #[instrument(skip(self, search), fields(search = search.term()), err)]
    async fn count(&self, search: &SearchFilter) -> Result<u64> {
        let records = self.records.read().await;
        Ok(records.iter().filter(|r| search.matches(r)).count() as u64)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip, sort = %filter.order.field), err)]
    async fn fetch(&self, filter: &RecordFilter) -> Result<Vec<RecordDBResponse>> {
        let records = self.records.read().await;
        let mut matching: Vec<&RecordDBResponse> = records.iter().filter(|r| filter.search.matches(r)).collect();
        matching.sort_by(|a, b| compare(a, b, &filter.order));

        let skip = usize::try_from(filter.skip).unwrap_or(usize::MAX);
        let limit = usize::try_from(filter.limit).unwrap_or(usize::MAX);

        Ok(matching.into_iter().skip(skip).take(limit).cloned().collect())
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&self, id: RecordId) -> Result<Option<RecordDBResponse>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }
}

fn compare(a: &RecordDBResponse, b: &RecordDBResponse, order: &SortOrder) -> Ordering {
    let primary = compare_field(a, b, order.field);
    let ordering = match order.tie_break() {
        Some(field) => primary.then_with(|| compare_field(a, b, field)),
        None => primary,
    };
    match order.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn compare_field(a: &RecordDBResponse, b: &RecordDBResponse, field: SortField) -> Ordering {
    match (a.text(field), b.text(field)) {
        (Some(x), Some(y)) => x.cmp(y),
        _ => a.id.cmp(&b.id),
    }
}
