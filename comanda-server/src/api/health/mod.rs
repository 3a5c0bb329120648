//! Health check API

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::state::ServerState;
use crate::utils::AppResult;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub backup_pending: bool,
}

pub fn router() -> Router<ServerState> {
    Router::new().route("/api/health", get(health))
}

/// GET /api/health
async fn health(State(state): State<ServerState>) -> AppResult<Json<HealthResponse>> {
    let backup_pending = state.storage.needs_backup().map_err(crate::utils::AppError::from)?;
    Ok(Json(HealthResponse {
        status: "ok",
        backup_pending,
    }))
}
