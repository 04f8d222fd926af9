//! Shutdown signal handling.

use tracing::warn;

/// Waits for SIGTERM or SIGINT and returns the name of the signal.
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed.
pub async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Like [`wait_for_shutdown_signal`], but never resolves when the handlers
/// cannot be installed.
pub async fn shutdown_signal() -> &'static str {
    match wait_for_shutdown_signal().await {
        Ok(signal) => signal,
        Err(e) => {
            warn!(error = %e, "failed to install shutdown signal handlers");
            std::future::pending().await
        }
    }
}
