//! Order/table session module
//!
//! - **storage**: redb persistence layer for orders, items, and the catalog
//! - **repository**: CRUD + query helpers, owner of total recomputation
//! - **session**: the table session engine (resolution, merge, state machine)
//!
//! # Data Flow
//!
//! 1. API handler validates input (and catalog availability where relevant)
//! 2. TableSessionEngine runs the operation in one write transaction
//! 3. OrderRepository recomputes the affected order total in that transaction
//! 4. Commit, then an OrderChange is broadcast to subscribers

pub mod repository;
pub mod session;
pub mod storage;

// Re-exports
pub use repository::OrderRepository;
pub use session::{SessionError, SessionResult, TableSessionEngine};
pub use storage::{PosStorage, StorageError, StorageResult};

// Re-export shared types for convenience
pub use shared::models::{
    ChangeTableOutcome, LineItem, Order, OrderChange, OrderChangeKind, OrderDetail, OrderStatus,
};
