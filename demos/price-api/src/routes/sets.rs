use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListSetsParams {
    #[serde(default)]
    pub force_refresh: bool,
}

/// GET /api/sets?force_refresh=true
///
/// All sets, newest first. Served from cache when possible.
pub async fn list_sets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSetsParams>,
) -> Result<Json<Value>, AppError> {
    let sets = state.sdk.sets().list(params.force_refresh).await?;

    let count = sets.len();
    Ok(Json(json!({ "data": sets, "count": count })))
}

/// GET /api/sets/grouped
///
/// Sets bucketed by expansion, in display order.
pub async fn grouped_sets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSetsParams>,
) -> Result<Json<Value>, AppError> {
    let groups = state
        .sdk
        .service()
        .get_grouped_sets(params.force_refresh)
        .await?;

    Ok(Json(json!({ "data": groups })))
}
