//! API request/response models for personal records.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::models::pagination::{ListMetadata, PaginatedResponse};
use crate::db::models::records::RecordDBResponse;
use crate::service::{ExportResult, ResultPage};
use crate::types::RecordId;

/// A personal record as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecordResponse {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub gender: String,
    pub ip_address: String,
}

impl From<RecordDBResponse> for RecordResponse {
    fn from(db: RecordDBResponse) -> Self {
        Self {
            id: db.id,
            first_name: db.first_name,
            last_name: db.last_name,
            email: db.email,
            gender: db.gender,
            ip_address: db.ip_address,
        }
    }
}

pub type ListRecordsResponse = PaginatedResponse<RecordResponse>;

impl From<ResultPage> for ListRecordsResponse {
    fn from(page: ResultPage) -> Self {
        Self {
            result: page.rows.into_iter().map(RecordResponse::from).collect(),
            page: page.page,
            limit: page.limit,
            total_rows: page.total_rows,
            total_pages: page.total_pages,
            metadata: ListMetadata::new(
                page.sort_field,
                page.sort_direction,
                page.search_term,
                page.execution_time_ms,
                page.requested_at,
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GetRecordResponse {
    /// Always `success`
    pub status: String,
    pub data: RecordResponse,
}

impl From<RecordDBResponse> for GetRecordResponse {
    fn from(db: RecordDBResponse) -> Self {
        Self {
            status: "success".to_string(),
            data: db.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    /// Always `success`
    pub status: String,
    /// Number of records in `data`
    pub total_exported: usize,
    pub data: Vec<RecordResponse>,
}

impl From<ExportResult> for ExportResponse {
    fn from(export: ExportResult) -> Self {
        Self {
            status: "success".to_string(),
            total_exported: export.total_exported,
            data: export.data.into_iter().map(RecordResponse::from).collect(),
        }
    }
}
