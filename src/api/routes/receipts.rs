use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use tracing::{info, warn};

use crate::agents::receipt_parser::ReceiptParserInput;
use crate::agents::Agent;
use crate::api::state::AppState;
use crate::api::ApiError;
use crate::document;
use crate::models::ParsedReceipt;

/// The `file` part of a receipt upload.
struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Upload>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?;

        return Ok(Some(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

pub async fn upload_receipt(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParsedReceipt>, ApiError> {
    let upload = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Missing multipart field 'file'".to_string()))?;

    // PDF scanning is CPU-bound
    let upload = Arc::new(upload);
    let read = {
        let upload = upload.clone();
        tokio::task::spawn_blocking(move || {
            document::receipt_text(
                &upload.bytes,
                upload.content_type.as_deref(),
                upload.file_name.as_deref(),
            )
        })
        .await?
    };

    // Unreadable documents still go through the parser, which falls back
    let text = read.unwrap_or_else(|e| {
        warn!("Could not read receipt text: {}", e);
        String::new()
    });

    let output = state
        .receipt_parser
        .execute(ReceiptParserInput {
            text,
            file_name: upload.file_name.clone(),
        })
        .await;

    if output.is_fallback() {
        warn!("Receipt parsing fell back: {:?}", output.notes);
    }
    info!(
        "Parsed receipt with {} expenses ({:?})",
        output.data.expenses.len(),
        output.provenance
    );

    let name = upload.file_name.as_deref().unwrap_or("receipt");
    state.archive.archive(name, &upload.bytes, &output.data).await;

    Ok(Json(output.data))
}

#[cfg(test)]
mod tests {
    use crate::agents::backend::{FailingBackend, MockBackend};
    use crate::agents::AgentMode;
    use crate::api::build_router;
    use crate::api::routes::test_util::send;
    use crate::api::state::test_support;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const BOUNDARY: &str = "receipt-boundary";

    fn multipart_request(field: &str, file_name: &str, content_type: &str, data: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n{data}\r\n--{b}--\r\n",
            b = BOUNDARY,
        );
        Request::builder()
            .method("POST")
            .uri("/upload-receipt")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_live_upload_parses_and_archives() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = Arc::new(MockBackend::new(
            r#"```json
{"expenses": [{"category": "shipping", "business_name": "QuickShip Logistics", "city": "San Francisco", "price": 5.75, "contact": "support@quickship.com", "details": "Standard shipping"}], "total_amount": 5.75, "receipt_date": null}
```"#,
        ));
        let app = build_router(test_support::state(
            backend.clone(),
            AgentMode::Live,
            tmp.path(),
        ));

        let (status, json) = send(
            app,
            multipart_request("file", "ship.txt", "text/plain", "QuickShip Logistics $5.75"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["expenses"][0]["business_name"], "QuickShip Logistics");
        assert_eq!(json["total_amount"], 5.75);

        let prompt = &backend.last_request().unwrap().messages[1].content;
        assert!(prompt.contains("QuickShip Logistics $5.75"));

        let archived: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(archived.len(), 2);
        assert!(archived.iter().any(|n| n.ends_with("-ship.txt")));
        assert!(archived.iter().any(|n| n.ends_with("-ship.parsed.json")));
    }

    #[tokio::test]
    async fn test_upload_larger_than_axum_default_limit() {
        let tmp = tempfile::tempdir().unwrap();
        let app = build_router(test_support::state(
            Arc::new(MockBackend::new("{}")),
            AgentMode::Demo,
            tmp.path(),
        ));

        let scan = "x".repeat(3 * 1024 * 1024);
        let (status, json) = send(
            app,
            multipart_request("file", "scan.txt", "text/plain", &scan),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_amount"], 39.25);
    }

    #[tokio::test]
    async fn test_backend_failure_returns_fixture_receipt() {
        let tmp = tempfile::tempdir().unwrap();
        let app = build_router(test_support::state(
            Arc::new(FailingBackend::Unavailable),
            AgentMode::Live,
            tmp.path(),
        ));

        let (status, json) = send(
            app,
            multipart_request("file", "r.txt", "text/plain", "Some receipt"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_amount"], 39.25);
        assert_eq!(json["expenses"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_file_field_is_400() {
        let tmp = tempfile::tempdir().unwrap();
        let app = build_router(test_support::state(
            Arc::new(MockBackend::new("{}")),
            AgentMode::Demo,
            tmp.path(),
        ));

        let (status, json) = send(
            app,
            multipart_request("attachment", "r.txt", "text/plain", "hello"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "BAD_REQUEST");
    }
}
