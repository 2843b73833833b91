//! OpenAPI documentation for the records API.
//!
//! Served as JSON at `/api-docs/openapi.json` and rendered with Scalar at `/docs`.

use utoipa::OpenApi;

use crate::api;
use crate::api::models::{
    health::HealthResponse,
    pagination::ListMetadata,
    records::{ExportResponse, GetRecordResponse, RecordResponse},
};
use crate::errors::ErrorBody;
use crate::query::{SortDirection, SortField};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "recordctl",
        description = "Searchable, sortable, paginated read access to personal records."
    ),
    paths(
        api::handlers::records::list_records,
        api::handlers::records::get_record,
        api::handlers::records::export_records,
        api::handlers::health::health,
    ),
    components(schemas(
        RecordResponse,
        ListMetadata,
        GetRecordResponse,
        ExportResponse,
        HealthResponse,
        ErrorBody,
        SortField,
        SortDirection,
    )),
    tags(
        (name = "personal", description = "Personal records"),
        (name = "health", description = "Service liveness"),
    )
)]
pub struct ApiDoc;
