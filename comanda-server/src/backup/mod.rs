//! Backup subsystem
//!
//! - **exporter**: snapshot format and the exporter seam (file-based impl)
//! - **worker**: debounced background worker driven by order changes

pub mod exporter;
pub mod worker;

pub use exporter::{BackupError, BackupExporter, BackupResult, BackupSnapshot, FileBackupExporter};
pub use worker::BackupWorker;
