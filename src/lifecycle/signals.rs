//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (Ctrl+C) and, on unix, SIGTERM
//! - Merge OS signals with the in-process `Shutdown` broadcast
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A signal handler that cannot be installed never fires, it does not abort

use tokio::sync::broadcast;

/// Resolves when the process is asked to stop, by signal or by `Shutdown::trigger`.
pub async fn shutdown_signal(mut shutdown: broadcast::Receiver<()>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let requested = async {
        // A closed channel means the coordinator is gone; keep serving.
        if shutdown.recv().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = requested => {},
    }

    tracing::info!("Shutdown signal received");
}
