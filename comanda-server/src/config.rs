/// Server configuration
///
/// # Environment variables
///
/// Every field can be overridden through the environment:
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | WORK_DIR | /var/lib/comanda | Working directory (database, logs, backups) |
/// | HTTP_PORT | 3000 | HTTP API port |
/// | LOG_LEVEL | info | Log filter level |
/// | LOG_DIR | <WORK_DIR>/logs | Rolling log file directory |
/// | BACKUP_DIR | <WORK_DIR>/backups | Snapshot output directory |
/// | BACKUP_DEBOUNCE_MS | 2000 | Quiet window before an export runs |
///
/// # Example
///
/// ```ignore
/// WORK_DIR=/data/comanda HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Working directory holding the database and derived files
    pub work_dir: String,
    /// HTTP API port
    pub http_port: u16,
    /// Log filter level: trace | debug | info | warn | error
    pub log_level: String,
    /// Rolling log file directory
    pub log_dir: String,
    /// Backup snapshot directory
    pub backup_dir: String,
    /// Debounce window for the backup worker (milliseconds)
    pub backup_debounce_ms: u64,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let work_dir = std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/comanda".into());
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| format!("{work_dir}/logs")),
            backup_dir: std::env::var("BACKUP_DIR")
                .unwrap_or_else(|_| format!("{work_dir}/backups")),
            backup_debounce_ms: std::env::var("BACKUP_DEBOUNCE_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(2000),
            work_dir,
        }
    }

    /// Override the working directory, mainly for tests.
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let work_dir = work_dir.into();
        let mut config = Self::from_env();
        config.log_dir = format!("{work_dir}/logs");
        config.backup_dir = format!("{work_dir}/backups");
        config.work_dir = work_dir;
        config
    }

    /// Path of the redb database file
    pub fn db_path(&self) -> String {
        format!("{}/pos.redb", self.work_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_work_dir_rebases_derived_paths() {
        let config = Config::with_work_dir("/tmp/comanda-test");
        assert_eq!(config.db_path(), "/tmp/comanda-test/pos.redb");
        assert_eq!(config.log_dir, "/tmp/comanda-test/logs");
        assert_eq!(config.backup_dir, "/tmp/comanda-test/backups");
    }
}
