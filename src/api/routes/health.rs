use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::agents::AgentMode;
use crate::api::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ApiHealthResponse {
    pub status: &'static str,
    pub knot_mock: bool,
    pub mode: AgentMode,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

pub async fn api_health(State(state): State<AppState>) -> Json<ApiHealthResponse> {
    Json(ApiHealthResponse {
        status: "healthy",
        knot_mock: state.knot.is_mock(),
        mode: state.mode,
    })
}

#[cfg(test)]
mod tests {
    use crate::agents::backend::MockBackend;
    use crate::agents::AgentMode;
    use crate::api::build_router;
    use crate::api::routes::test_util::get_json;
    use crate::api::state::test_support;
    use axum::http::StatusCode;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_health() {
        let tmp = tempfile::tempdir().unwrap();
        let app = build_router(test_support::state(
            Arc::new(MockBackend::new("{}")),
            AgentMode::Demo,
            tmp.path(),
        ));

        let (status, json) = get_json(app, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn test_api_health_reports_mode_and_knot() {
        let tmp = tempfile::tempdir().unwrap();
        let app = build_router(test_support::state(
            Arc::new(MockBackend::new("{}")),
            AgentMode::Live,
            tmp.path(),
        ));

        let (status, json) = get_json(app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            json!({"status": "healthy", "knot_mock": true, "mode": "live"})
        );
    }
}
