use crate::db::errors::DbError;
use crate::query::InvalidRecordId;
use crate::types::Operation;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error as ThisError;
use utoipa::ToSchema;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data, e.g. a non-numeric record ID
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} not found")]
    NotFound { resource: String, id: String },

    /// The record store failed while serving an operation
    #[error("Failed to {operation}")]
    Store {
        operation: Operation,
        #[source]
        source: DbError,
    },

    /// Per-client request budget exhausted
    #[error("Too many requests, please try again later.")]
    TooManyRequests,

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// JSON body of every error response except 429
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Always `error`
    pub status: String,
    pub message: String,
    /// Underlying failure detail, present on store failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the message shown to clients
    pub fn user_message(&self) -> String {
        match self {
            Error::Other(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    fn body(&self) -> ErrorBody {
        ErrorBody {
            status: "error".to_string(),
            message: self.user_message(),
            error: match self {
                Error::Store { source, .. } => Some(source.to_string()),
                _ => None,
            },
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Store { source, .. } => {
                tracing::error!(error = ?source, "{}: {:#}", self, source);
            }
            Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::TooManyRequests => {
                tracing::info!("Rate limited: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        match &self {
            // The rate-limit body carries the numeric status instead of "error"
            Error::TooManyRequests => (status, Json(json!({ "status": status.as_u16(), "message": self.user_message() }))).into_response(),
            _ => (status, Json(self.body())).into_response(),
        }
    }
}

impl From<InvalidRecordId> for Error {
    fn from(err: InvalidRecordId) -> Self {
        Error::BadRequest { message: err.to_string() }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_store_error_shape() {
        let err = Error::Store {
            operation: Operation::List,
            source: DbError::Unavailable {
                message: "pool timed out while waiting for an open connection".to_string(),
            },
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({
                "status": "error",
                "message": "Failed to fetch personal data",
                "error": "Record store unavailable: pool timed out while waiting for an open connection"
            })
        );
    }

    #[tokio::test]
    async fn test_not_found_shape() {
        let err = Error::NotFound {
            resource: "Personal data".to_string(),
            id: "42".to_string(),
        };
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "status": "error", "message": "Personal data not found" })
        );
    }

    #[tokio::test]
    async fn test_invalid_id_is_bad_request() {
        let err: Error = crate::query::parse_record_id("abc").unwrap_err().into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({ "status": "error", "message": "Invalid ID parameter. Must be a valid number." })
        );
    }

    #[tokio::test]
    async fn test_too_many_requests_shape() {
        let response = Error::TooManyRequests.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body_json(response).await,
            json!({ "status": 429, "message": "Too many requests, please try again later." })
        );
    }

    #[tokio::test]
    async fn test_other_errors_hide_details() {
        let response = Error::Other(anyhow::anyhow!("secret connection string")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("error").is_none());
    }
}
