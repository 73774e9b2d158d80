//! OS signal handling.
//!
//! Translates SIGINT (Ctrl-C) into the internal shutdown signal so the
//! accept loop exits cleanly.

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Spawn the task that waits for Ctrl-C and triggers shutdown.
pub fn spawn_interrupt_handler(shutdown: Arc<Shutdown>) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install interrupt handler");
            return;
        }
        tracing::info!("Interrupt received, triggering shutdown");
        shutdown.trigger();
    })
}
