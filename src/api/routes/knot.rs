use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde_json::Value;
use tracing::info;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::knot::{CreateSessionRequest, KnotSession, SyncTransactionsRequest};

/// Body is optional; an empty request creates a default transaction-link session.
pub async fn create_session(
    State(state): State<AppState>,
    body: Option<Json<CreateSessionRequest>>,
) -> Json<KnotSession> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let session = state.knot.create_session(&request).await;
    info!(
        "Knot session {} for {} (mock: {})",
        session.session_id, request.external_user_id, session.mock
    );
    Json(session)
}

pub async fn sync_transactions(
    State(state): State<AppState>,
    body: Result<Json<SyncTransactionsRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body?;
    Ok(Json(state.knot.sync_transactions(&request).await))
}

#[cfg(test)]
mod tests {
    use crate::agents::backend::MockBackend;
    use crate::agents::AgentMode;
    use crate::api::build_router;
    use crate::api::routes::test_util::{post_json, send};
    use crate::api::state::test_support;
    use crate::knot::MOCK_SESSION_ID;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;

    fn app(dir: &std::path::Path) -> axum::Router {
        build_router(test_support::state(
            Arc::new(MockBackend::new("{}")),
            AgentMode::Demo,
            dir,
        ))
    }

    #[tokio::test]
    async fn test_create_session_without_credentials() {
        let tmp = tempfile::tempdir().unwrap();
        let (status, json) = post_json(
            app(tmp.path()),
            "/api/session/create",
            r#"{"type": "transaction_link", "external_user_id": "user-9"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sessionId"], MOCK_SESSION_ID);
        assert_eq!(json["mock"], true);
    }

    #[tokio::test]
    async fn test_create_session_empty_body() {
        let tmp = tempfile::tempdir().unwrap();
        let (status, json) = send(
            app(tmp.path()),
            Request::builder()
                .method("POST")
                .uri("/api/session/create")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sessionId"], MOCK_SESSION_ID);
    }

    #[tokio::test]
    async fn test_sync_transactions_mock() {
        let tmp = tempfile::tempdir().unwrap();
        let (status, json) = post_json(
            app(tmp.path()),
            "/api/transactions/sync",
            r#"{"external_user_id": "user-9", "limit": 2}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["transactions"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_sync_transactions_limit_is_capped() {
        let tmp = tempfile::tempdir().unwrap();
        let (status, json) = post_json(
            app(tmp.path()),
            "/api/transactions/sync",
            r#"{"external_user_id": "user-9", "limit": 2000000}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["transactions"].as_array().unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_sync_transactions_bad_body_is_400() {
        let tmp = tempfile::tempdir().unwrap();
        let (status, json) = post_json(
            app(tmp.path()),
            "/api/transactions/sync",
            r#"{"limit": -1}"#,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }
}
