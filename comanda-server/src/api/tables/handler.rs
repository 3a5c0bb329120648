//! Table API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::Order;

use crate::state::ServerState;
use crate::utils::AppResult;

/// GET /api/tables/active - labels currently holding an open order
pub async fn active(State(state): State<ServerState>) -> AppResult<Json<Vec<String>>> {
    Ok(Json(state.engine.active_tables()?))
}

/// POST /api/tables/:label/open - open (or resume) the session for a table
pub async fn open(
    State(state): State<ServerState>,
    Path(label): Path<String>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.engine.open_table(&label)?))
}
