//! OS signal handling.
//!
//! # Responsibilities
//! - Watch for termination signals (SIGTERM, and Ctrl-C interactively)
//! - Trigger graceful shutdown exactly once
//!
//! # Design Decisions
//! - The watcher runs for the whole process lifetime; signals received
//!   while shutdown is already draining are logged and otherwise ignored
//! - Uses Tokio's async-safe signal handling

use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::Shutdown;

/// Spawn the signal watcher task.
pub fn spawn(shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(watch(shutdown))
}

#[cfg(unix)]
async fn watch(shutdown: Shutdown) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(err) => {
            tracing::error!(error = %err, "failed to install SIGTERM handler");
            return;
        }
    };

    loop {
        let name = tokio::select! {
            _ = terminate.recv() => "SIGTERM",
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    tracing::error!(error = %err, "failed to listen for Ctrl-C");
                    return;
                }
                "interrupt"
            }
        };
        handle(name, &shutdown);
    }
}

#[cfg(not(unix))]
async fn watch(shutdown: Shutdown) {
    loop {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            return;
        }
        handle("interrupt", &shutdown);
    }
}

fn handle(name: &str, shutdown: &Shutdown) {
    if shutdown.trigger() {
        tracing::info!(signal = name, "termination signal received; shutting down gracefully");
    } else {
        tracing::debug!(signal = name, "shutdown already in progress");
    }
}
