//! API route modules
//!
//! # Structure
//!
//! - [`health`] - liveness probe
//! - [`tables`] - table session entry points
//! - [`orders`] - order lifecycle and line items
//! - [`categories`] - menu category management
//! - [`products`] - menu product management

pub mod categories;
pub mod health;
pub mod orders;
pub mod products;
pub mod tables;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::ServerState;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

/// Assemble the full API router with tracing and CORS applied.
pub fn router() -> Router<ServerState> {
    Router::new()
        .merge(health::router())
        .merge(tables::router())
        .merge(orders::router())
        .merge(categories::router())
        .merge(products::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
