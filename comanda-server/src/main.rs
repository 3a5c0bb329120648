use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use comanda_server::backup::{BackupWorker, FileBackupExporter};
use comanda_server::utils::logger::init_logger_with_file;
use comanda_server::{Config, ServerState, api};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment and logging
    dotenv::dotenv().ok();
    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    std::fs::create_dir_all(&config.log_dir)?;
    init_logger_with_file(Some(&config.log_level), Some(&config.log_dir));

    tracing::info!("Comanda POS server starting...");

    // 2. Open the store and wire services
    let state = ServerState::initialize(&config)?;

    // 3. Background backup worker
    let shutdown = CancellationToken::new();
    let worker = BackupWorker::new(
        state.storage.clone(),
        Arc::new(FileBackupExporter::new(&config.backup_dir)),
        state.engine.subscribe(),
        Duration::from_millis(config.backup_debounce_ms),
        shutdown.clone(),
    );
    let worker_handle = tokio::spawn(worker.run());

    // 4. HTTP server
    let app = api::router().with_state(state);
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 5. Drain the backup worker before exit
    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        tracing::error!("Backup worker join error: {e}");
    }

    tracing::info!("Comanda POS server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
    tracing::info!("Shutdown signal received");
}
