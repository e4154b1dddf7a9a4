use std::sync::Arc;

use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

/// GET /api/status
///
/// Cache health: refresh and degradation counters plus the mapping size.
pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let service = state.sdk.service();
    let current = service.current_sets();

    Ok(Json(json!({
        "sdk": state.sdk.to_string(),
        "stats": service.stats(),
        "mappedSets": service.mapping().len(),
        "currentSets": current.set_ids().collect::<Vec<_>>(),
        "currentSetsUpdatedAt": current.updated_at(),
    })))
}
