use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};

use crate::agents::supplier_search::SupplierSearchInput;
use crate::agents::Agent;
use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::AlternativesResponse;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub city: String,
    pub current_price: f64,
}

pub async fn search_alternatives(
    State(state): State<AppState>,
    Path(category): Path<String>,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<AlternativesResponse>, ApiError> {
    let Query(params) = query?;
    if !params.current_price.is_finite() {
        return Err(ApiError::BadRequest(
            "current_price must be a finite number".to_string(),
        ));
    }

    let output = state
        .supplier_search
        .execute(SupplierSearchInput {
            category,
            city: params.city,
            current_price: params.current_price,
        })
        .await;

    if output.is_fallback() {
        warn!("Supplier search fell back: {:?}", output.notes);
    }
    info!(
        "Returning {} alternatives ({:?})",
        output.data.alternatives.len(),
        output.provenance
    );

    Ok(Json(output.data))
}
