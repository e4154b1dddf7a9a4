use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/sets/:set_id/cards
///
/// Cards in a set. An upstream outage yields an empty list, not an error.
pub async fn list_cards(
    State(state): State<Arc<AppState>>,
    Path(set_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let cards = state.sdk.cards().for_set(set_id).await?;

    let count = cards.len();
    Ok(Json(json!({ "data": cards, "count": count })))
}
