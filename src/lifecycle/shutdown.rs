//! Shutdown coordination.

use tokio::sync::broadcast;

use crate::lifecycle::signals;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks (the HTTP server, the config watcher loop) subscribe
/// and stop once the signal is broadcast.
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Broadcast the shutdown signal. Safe to call more than once.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Trigger shutdown when the process receives Ctrl+C or SIGTERM.
    pub fn trigger_on_signal(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            signals::wait_for_signal().await;
            shutdown.trigger();
        });
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
