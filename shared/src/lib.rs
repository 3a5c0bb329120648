//! Shared types for the Comanda POS
//!
//! Data model and payload types used by both comanda-server and any
//! API consumer (desk client, reporting scripts).

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
