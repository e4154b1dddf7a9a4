use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PricingParams {
    pub set_id: Option<i64>,
}

/// GET /api/pricing/:card_id?set_id=557
///
/// Pricing for one card with cache metadata (`fromCache`, `cacheAgeSeconds`, `isStale`).
pub async fn get_pricing(
    State(state): State<Arc<AppState>>,
    Path(card_id): Path<i64>,
    Query(params): Query<PricingParams>,
) -> Result<Json<Value>, AppError> {
    let set_id = params
        .set_id
        .ok_or_else(|| AppError::bad_request("set_id query parameter is required"))?;

    let result = state.sdk.prices().get(card_id, set_id).await?;
    Ok(Json(json!({ "data": result })))
}
