use axum::{Json, extract::State};
use chrono::{SecondsFormat, Utc};

use crate::{AppState, api::models::health::HealthResponse};

/// Liveness probe. Does not touch the record store.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    summary = "Liveness check",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[cfg(test)]
mod tests {
    use crate::api::models::health::HealthResponse;
    use crate::test_utils::{create_test_app, create_test_app_with_store, FailingStore};
    use std::sync::Arc;

    #[test_log::test(tokio::test)]
    async fn test_health() {
        let server = create_test_app(vec![]);

        let response = server.get("/health").await;

        response.assert_status_ok();
        let body: HealthResponse = response.json();
        assert_eq!(body.status, "ok");
        assert!(body.uptime >= 0.0);
        assert!(chrono::DateTime::parse_from_rfc3339(&body.timestamp).is_ok());
    }

    #[test_log::test(tokio::test)]
    async fn test_health_ignores_store() {
        let server = create_test_app_with_store(Arc::new(FailingStore));
        server.get("/health").await.assert_status_ok();
    }
}
