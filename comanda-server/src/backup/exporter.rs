//! Backup exporters
//!
//! An exporter turns a [`BackupSnapshot`] into a durable copy somewhere
//! outside the live store. The trait seam exists so the worker can be tested
//! without touching the filesystem.

use serde::Serialize;
use shared::models::{Category, LineItem, Order, Product};
use std::fs;
use std::path::PathBuf;

use crate::orders::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Backup I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Backup storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Backup serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type BackupResult<T> = Result<T, BackupError>;

/// Full point-in-time copy of the operational data
#[derive(Debug, Serialize)]
pub struct BackupSnapshot {
    pub exported_at: i64,
    pub orders: Vec<Order>,
    pub items: Vec<LineItem>,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
}

impl BackupSnapshot {
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
            && self.items.is_empty()
            && self.categories.is_empty()
            && self.products.is_empty()
    }
}

pub trait BackupExporter: Send + Sync {
    /// Persist a snapshot. Must only return `Ok` once the copy is durable;
    /// the worker clears the pending flag on success.
    fn export(&self, snapshot: &BackupSnapshot) -> BackupResult<()>;
}

/// Writes timestamped JSON snapshots into a backup directory
pub struct FileBackupExporter {
    dir: PathBuf,
}

impl FileBackupExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl BackupExporter for FileBackupExporter {
    fn export(&self, snapshot: &BackupSnapshot) -> BackupResult<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self
            .dir
            .join(format!("pos-backup-{}.json", snapshot.exported_at));
        let tmp = path.with_extension("json.tmp");

        // Write to a temp file first so a crash never leaves a truncated
        // snapshot behind under the final name.
        fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        fs::rename(&tmp, &path)?;

        tracing::info!(
            path = %path.display(),
            orders = snapshot.orders.len(),
            items = snapshot.items.len(),
            "Backup snapshot written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_exporter_writes_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = FileBackupExporter::new(dir.path());

        let snapshot = BackupSnapshot {
            exported_at: 1_700_000_000_000,
            orders: vec![],
            items: vec![],
            categories: vec![],
            products: vec![],
        };
        exporter.export(&snapshot).unwrap();

        let path = dir.path().join("pos-backup-1700000000000.json");
        let raw = std::fs::read_to_string(path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["exported_at"], 1_700_000_000_000_i64);
    }
}
