//! Category API handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{Category, CategoryCreate, Product};

use crate::state::ServerState;
use crate::utils::AppResult;

/// GET /api/categories - all categories, sorted by name
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(state.catalog.list_categories()?))
}

/// POST /api/categories
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CategoryCreate>,
) -> AppResult<Json<Category>> {
    Ok(Json(state.catalog.add_category(payload)?))
}

/// PUT /api/categories/:id/toggle - flip the active flag
pub async fn toggle(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Category>> {
    Ok(Json(state.catalog.toggle_category(&id)?))
}

/// GET /api/categories/:id/products - active products of the category
pub async fn products(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<Product>>> {
    Ok(Json(state.catalog.products_by_category(&id)?))
}
