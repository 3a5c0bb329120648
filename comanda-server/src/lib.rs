//! Comanda POS server
//!
//! Single-location point-of-sale order manager. The core is the table
//! session engine: open tabs against tables, line items with a cached
//! running total, a preparing → served → paid status flow, and a
//! table-merge operation that consolidates two open tabs into one.
//!
//! # Architecture
//!
//! ```text
//! HTTP API (axum) → TableSessionEngine → OrderRepository → PosStorage (redb)
//!                        ↓
//!                  broadcast OrderChange → BackupWorker (fire-and-forget)
//! ```

pub mod api;
pub mod backup;
pub mod catalog;
pub mod config;
pub mod orders;
pub mod state;
pub mod utils;

pub use config::Config;
pub use state::ServerState;
