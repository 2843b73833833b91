//! Record service: runs validated queries against a [`RecordStore`].
//!
//! The service is the operation boundary. Store failures are wrapped into
//! [`Error::Store`] tagged with the [`Operation`] that failed; nothing is retried and no
//! partial page is ever returned.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::db::{
    handlers::{RecordFilter, RecordStore},
    models::records::RecordDBResponse,
};
use crate::errors::{Error, Result};
use crate::middleware::RequestStart;
use crate::query::{ExportDescriptor, QueryDescriptor, SortDirection, SortField, SortOrder, total_pages};
use crate::types::{Operation, RecordId};

/// One page of a listing plus the metadata needed to render pagination controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPage {
    pub rows: Vec<RecordDBResponse>,
    pub total_rows: u64,
    pub total_pages: u64,
    pub page: u64,
    pub limit: u64,
    pub sort_field: SortField,
    pub sort_direction: SortDirection,
    pub search_term: String,
    pub execution_time_ms: u64,
    /// When the request was received
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub total_exported: usize,
    pub data: Vec<RecordDBResponse>,
}

#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn RecordStore>,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Count then fetch one page. `started` is when the request began, so the reported
    /// execution time covers the whole request up to this point.
    #[instrument(skip_all, fields(page = descriptor.page, limit = descriptor.limit, sort = %descriptor.sort_field), err)]
    pub async fn list(&self, descriptor: &QueryDescriptor, started: RequestStart) -> Result<ResultPage> {
        let search = descriptor.filter();

        let total_rows = self.store.count(&search).await.map_err(store_error(Operation::List))?;

        let filter = RecordFilter::new(descriptor.offset(), descriptor.limit)
            .with_search(search)
            .with_order(descriptor.order());
        let rows = self.store.fetch(&filter).await.map_err(store_error(Operation::List))?;

        Ok(ResultPage {
            rows,
            total_rows,
            total_pages: total_pages(total_rows, descriptor.limit),
            page: descriptor.page,
            limit: descriptor.limit,
            sort_field: descriptor.sort_field,
            sort_direction: descriptor.sort_direction,
            search_term: descriptor.search_term.clone(),
            execution_time_ms: u64::try_from(started.at.elapsed().as_millis()).unwrap_or(u64::MAX),
            requested_at: started.timestamp,
        })
    }

    /// `Ok(None)` is the not-found result; it is not an error at this layer.
    #[instrument(skip(self), err)]
    pub async fn get_by_id(&self, id: RecordId) -> Result<Option<RecordDBResponse>> {
        self.store.get_by_id(id).await.map_err(store_error(Operation::GetById))
    }

    /// Bulk fetch, newest id first, capped at `max_export` rows.
    #[instrument(skip_all, fields(max_export = descriptor.max_export), err)]
    pub async fn export(&self, descriptor: &ExportDescriptor) -> Result<ExportResult> {
        let filter = RecordFilter::new(0, descriptor.max_export)
            .with_search(descriptor.filter())
            .with_order(SortOrder::EXPORT);
        let data = self.store.fetch(&filter).await.map_err(store_error(Operation::Export))?;

        Ok(ExportResult {
            total_exported: data.len(),
            data,
        })
    }
}

fn store_error(operation: Operation) -> impl FnOnce(crate::db::errors::DbError) -> Error {
    move |source| Error::Store { operation, source }
}
