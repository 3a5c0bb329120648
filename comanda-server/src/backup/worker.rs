//! BackupWorker - background worker that keeps an off-store copy fresh
//!
//! Subscribes to the session engine's change broadcast, debounces bursts of
//! changes, and exports a full snapshot through a [`BackupExporter`]. A
//! persistent `needs_backup` flag in the store survives restarts: it is set
//! as soon as a change is observed (and inside the payment transaction
//! itself) and cleared only after an export succeeds, so a crash between
//! change and export is caught up on the next startup.

use shared::models::OrderChange;
use shared::util::now_millis;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::exporter::{BackupExporter, BackupResult, BackupSnapshot};
use crate::orders::PosStorage;

pub struct BackupWorker {
    storage: PosStorage,
    exporter: Arc<dyn BackupExporter>,
    changes: broadcast::Receiver<OrderChange>,
    debounce: Duration,
    shutdown: CancellationToken,
}

impl BackupWorker {
    pub fn new(
        storage: PosStorage,
        exporter: Arc<dyn BackupExporter>,
        changes: broadcast::Receiver<OrderChange>,
        debounce: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            storage,
            exporter,
            changes,
            debounce,
            shutdown,
        }
    }

    /// Run the backup worker
    ///
    /// 1. Catch-up export on startup when the pending flag is set
    /// 2. Listen for change broadcasts, mark pending, debounce, export
    /// 3. Final export on shutdown if anything is still pending
    pub async fn run(mut self) {
        tracing::info!("BackupWorker started");

        match self.storage.needs_backup() {
            Ok(true) => {
                tracing::info!("Pending backup flag found on startup, exporting");
                self.try_export();
            }
            Ok(false) => {}
            Err(e) => tracing::error!("Failed to read backup flag: {e}"),
        }

        let mut deadline: Option<Instant> = None;

        loop {
            let sleep_until = deadline.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("BackupWorker shutting down");
                    if matches!(self.storage.needs_backup(), Ok(true)) {
                        self.try_export();
                    }
                    break;
                }

                _ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                    deadline = None;
                    self.try_export();
                }

                result = self.changes.recv() => {
                    match result {
                        Ok(change) => {
                            tracing::debug!(order_id = %change.order_id, kind = ?change.kind, "Change observed");
                            self.mark_pending();
                            deadline = Some(Instant::now() + self.debounce);
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!("BackupWorker lagged {n} changes, exporting immediately");
                            self.mark_pending();
                            deadline = Some(Instant::now());
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Change channel closed, BackupWorker stopping");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("BackupWorker stopped");
    }

    /// Persist the pending flag so the change survives a crash before the
    /// debounced export runs.
    fn mark_pending(&self) {
        let result = self.storage.begin_write().and_then(|txn| {
            self.storage.set_needs_backup(&txn)?;
            txn.commit().map_err(crate::orders::StorageError::from)
        });
        if let Err(e) = result {
            tracing::error!("Failed to persist backup flag: {e}");
        }
    }

    fn try_export(&self) {
        match self.attempt() {
            Ok(()) => tracing::debug!("Backup export complete"),
            Err(e) => {
                // Flag stays set; the next change or restart retries.
                tracing::error!("Backup export failed: {e}");
            }
        }
    }

    /// One export attempt: snapshot, export, clear the flag. The flag is
    /// cleared only after the exporter reports success. An empty store has
    /// nothing worth copying; the flag is cleared without an export.
    pub fn attempt(&self) -> BackupResult<()> {
        let snapshot = self.snapshot()?;
        if snapshot.is_empty() {
            tracing::debug!("Backup skipped: store is empty");
            self.storage.clear_needs_backup()?;
            return Ok(());
        }
        self.exporter.export(&snapshot)?;
        self.storage.clear_needs_backup()?;
        Ok(())
    }

    fn snapshot(&self) -> BackupResult<BackupSnapshot> {
        let orders = self.storage.get_all_orders()?;
        let mut items = Vec::new();
        for order in &orders {
            items.extend(self.storage.items_for_order(&order.id)?);
        }
        Ok(BackupSnapshot {
            exported_at: now_millis(),
            orders,
            items,
            categories: self.storage.get_all_categories()?,
            products: self.storage.get_all_products()?,
        })
    }
}
