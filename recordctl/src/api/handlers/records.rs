//! HTTP handlers for personal records.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use crate::{
    AppState,
    api::models::{
        pagination::PaginatedResponse,
        records::{ExportResponse, GetRecordResponse, ListRecordsResponse, RecordResponse},
    },
    errors::{Error, ErrorBody, Result},
    middleware::RequestStart,
    query::{ExportDescriptor, ExportParams, ListParams, QueryDescriptor, parse_record_id},
};

/// Decoded query string, in order, duplicates kept
type QueryPairs = Query<Vec<(String, String)>>;

#[utoipa::path(
    get,
    path = "/api/personal",
    tag = "personal",
    summary = "List personal records",
    description = "Search, sort and paginate. Malformed parameters fall back to their defaults rather than failing.",
    params(ListParams),
    responses(
        (status = 200, description = "One page of matching records", body = PaginatedResponse<RecordResponse>),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_records(
    State(state): State<AppState>,
    start: Option<Extension<RequestStart>>,
    Query(pairs): QueryPairs,
) -> Result<Json<ListRecordsResponse>> {
    let started = start.map(|Extension(start)| start).unwrap_or_else(RequestStart::now);
    let descriptor = QueryDescriptor::from_params(&ListParams::from_pairs(pairs), state.config.listing.max_limit);

    let page = state.records.list(&descriptor, started).await?;

    Ok(Json(page.into()))
}

#[utoipa::path(
    get,
    path = "/api/personal/{id}",
    tag = "personal",
    summary = "Get personal record",
    params(
        ("id" = String, Path, description = "Integer record ID"),
    ),
    responses(
        (status = 200, description = "The record", body = GetRecordResponse),
        (status = 400, description = "ID is not an integer", body = ErrorBody),
        (status = 404, description = "No record with this ID", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_record(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<GetRecordResponse>> {
    let record_id = parse_record_id(&id)?;

    match state.records.get_by_id(record_id).await? {
        Some(record) => Ok(Json(record.into())),
        None => Err(Error::NotFound {
            resource: "Personal data".to_string(),
            id,
        }),
    }
}

#[utoipa::path(
    get,
    path = "/api/personal/export",
    tag = "personal",
    summary = "Export personal records",
    description = "Matching records, newest ID first, capped at `maxExport`. Sort parameters are ignored.",
    params(ExportParams),
    responses(
        (status = 200, description = "Exported records", body = ExportResponse),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
#[tracing::instrument(skip_all)]
pub async fn export_records(State(state): State<AppState>, Query(pairs): QueryPairs) -> Result<Json<ExportResponse>> {
    let descriptor = ExportDescriptor::from_params(&ExportParams::from_pairs(pairs));

    let export = state.records.export(&descriptor).await?;

    Ok(Json(export.into()))
}
