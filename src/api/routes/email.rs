use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{EmailDraft, MarketData, SupplierInfo};

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub supplier_info: SupplierInfo,
    pub category: String,
    pub current_price: f64,
    #[serde(default)]
    pub is_current_supplier: bool,
    /// Kept raw: clients send averages over an empty list as null
    #[serde(default)]
    pub market_data: Option<Value>,
}

fn market_data_from(raw: Option<Value>) -> Result<MarketData, ApiError> {
    let raw = match raw {
        Some(Value::Object(map)) if !map.is_empty() => Value::Object(map),
        _ => {
            return Err(ApiError::BadRequest(
                "Market data required for negotiation email".to_string(),
            ))
        }
    };

    serde_json::from_value(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid market data: {}", e)))
}

pub async fn draft_email(
    State(state): State<AppState>,
    body: Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<EmailDraft>, ApiError> {
    let Json(request) = body?;
    let output = if request.is_current_supplier {
        let market_data = market_data_from(request.market_data)?;
        state
            .negotiator
            .draft_negotiation_email(
                request.supplier_info,
                &request.category,
                request.current_price,
                market_data,
            )
            .await
    } else {
        state
            .negotiator
            .draft_new_supplier_email(
                request.supplier_info,
                &request.category,
                request.current_price,
            )
            .await
    };

    if output.is_fallback() {
        warn!("Email draft fell back: {:?}", output.notes);
    }

    Ok(Json(output.data))
}
