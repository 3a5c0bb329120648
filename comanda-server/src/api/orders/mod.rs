//! Order API module

mod handler;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/{id}", get(handler::get_by_id).delete(handler::delete))
        .route("/{id}/items", post(handler::add_item))
        .route(
            "/{id}/items/{item_id}",
            put(handler::update_item).delete(handler::remove_item),
        )
        .route("/{id}/table", put(handler::change_table))
        .route("/{id}/status", put(handler::set_status))
        .route("/{id}/payment", post(handler::pay))
        .route("/{id}/close", post(handler::close))
}
