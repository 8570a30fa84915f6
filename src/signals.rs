// src/signals.rs

//! Bridge from process termination signals to a cancellation token.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `token` on the first SIGINT (Ctrl-C) or, on Unix, SIGTERM.
///
/// Later signals are not observed here; cancelling is idempotent anyway.
pub fn cancel_on_signals(token: CancellationToken) -> JoinHandle<()> {
    cancel_on(token, wait_for_termination())
}

/// Cancel `token` once `signal` resolves with the name of a received signal.
///
/// If listening fails the token is left alone: the watch keeps running and
/// can still be stopped through other clones of the token.
pub fn cancel_on<F>(token: CancellationToken, signal: F) -> JoinHandle<()>
where
    F: Future<Output = std::io::Result<&'static str>> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            received = signal => match received {
                Ok(name) => {
                    info!(signal = name, "termination signal received");
                    token.cancel();
                }
                Err(e) => warn!(error = %e, "failed to listen for termination signals"),
            },
        }
    })
}

#[cfg(unix)]
async fn wait_for_termination() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|_| "Ctrl-C")
}
