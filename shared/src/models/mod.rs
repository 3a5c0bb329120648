//! Data models
//!
//! Shared between comanda-server and API consumers. Entity IDs are opaque
//! strings (UUID v4) except line item IDs, which are store-assigned `u64`
//! sequence values. Timestamps are Unix millis.

pub mod category;
pub mod order;
pub mod product;

// Re-exports
pub use category::*;
pub use order::*;
pub use product::*;
