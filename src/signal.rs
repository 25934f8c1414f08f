//! Process signals mapped onto the server's running flag

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Clear `running` on SIGINT or SIGTERM so the current recording is finalized
///
/// Handlers are registered before this returns; the watcher runs as a task.
pub fn watch_shutdown_signals(running: Arc<AtomicBool>) -> Result<JoinHandle<()>> {
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to register SIGTERM handler")?;

    Ok(tokio::spawn(async move {
        let interrupt = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => "SIGINT",
                Err(e) => {
                    warn!("Failed to listen for SIGINT: {}", e);
                    std::future::pending().await
                }
            }
        };

        #[cfg(unix)]
        let terminate = async move {
            sigterm.recv().await;
            "SIGTERM"
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<&str>();

        let signal = tokio::select! {
            name = interrupt => name,
            name = terminate => name,
        };

        info!("Received {}, finishing current recording", signal);
        running.store(false, Ordering::SeqCst);
    }))
}
