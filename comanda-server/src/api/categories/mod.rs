//! Category API module

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::state::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/categories", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/{id}/toggle", put(handler::toggle))
        .route("/{id}/products", get(handler::products))
}
