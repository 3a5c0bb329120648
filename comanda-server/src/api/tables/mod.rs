//! Table API module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tables", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/active", get(handler::active))
        .route("/{label}/open", post(handler::open))
}
