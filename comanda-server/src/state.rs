//! Server state - shared references to every service
//!
//! One `ServerState` is built at startup and cloned into each request
//! handler. All fields are `Arc`-backed, so a clone is a handful of
//! refcount bumps.

use std::sync::Arc;

use crate::catalog::CatalogService;
use crate::config::Config;
use crate::orders::{OrderRepository, PosStorage, TableSessionEngine};
use crate::utils::{AppError, AppResult};

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub storage: PosStorage,
    pub engine: Arc<TableSessionEngine>,
    pub catalog: Arc<CatalogService>,
}

impl ServerState {
    /// Open the store under the configured working directory and wire the
    /// services together.
    pub fn initialize(config: &Config) -> AppResult<Self> {
        std::fs::create_dir_all(&config.work_dir)
            .map_err(|e| AppError::internal(format!("cannot create work dir: {e}")))?;

        let storage = PosStorage::open(config.db_path())?;
        Self::with_storage(config.clone(), storage)
    }

    /// Wire services over an already-open store (tests use the in-memory
    /// backend here).
    pub fn with_storage(config: Config, storage: PosStorage) -> AppResult<Self> {
        let engine = Arc::new(TableSessionEngine::new(OrderRepository::new(
            storage.clone(),
        )));
        let catalog = Arc::new(CatalogService::new(storage.clone())?);
        Ok(Self {
            config,
            storage,
            engine,
            catalog,
        })
    }
}
