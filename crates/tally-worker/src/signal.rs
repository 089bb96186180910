//! Signal handling for graceful shutdown.
//!
//! The listener only cancels a token. The worker notices the cancellation at
//! its next cycle boundary and performs the final flush on its own task.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Install SIGINT, SIGTERM and SIGQUIT handlers and cancel `token` on the
/// first one received.
///
/// # Errors
///
/// Returns the I/O error if a handler cannot be installed.
#[cfg(unix)]
pub fn watch_for_shutdown(token: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    Ok(tokio::spawn(async move {
        let name = tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
            _ = sigquit.recv() => "SIGQUIT",
            () = token.cancelled() => return,
        };
        info!(signal = name, "Signal received. Flushing buffer before exit...");
        token.cancel();
    }))
}

/// Cancel `token` on Ctrl-C.
///
/// # Errors
///
/// Infallible on this platform; the signature matches the Unix variant.
#[cfg(not(unix))]
pub fn watch_for_shutdown(token: CancellationToken) -> std::io::Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if let Err(error) = result {
                    tracing::error!(%error, "Ctrl-C handler failed");
                    return;
                }
            }
            () = token.cancelled() => return,
        }
        info!(signal = "Ctrl-C", "Signal received. Flushing buffer before exit...");
        token.cancel();
    }))
}
