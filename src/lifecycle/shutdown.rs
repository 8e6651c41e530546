//! Graceful shutdown fan-out.

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::lifecycle::signals::shutdown_signal;

/// Broadcasts a single stop notice to the server and any helper tasks.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Receiver that resolves once [`Shutdown::trigger`] is called.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify every subscriber. Returns how many were listening.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }

    /// Trigger on SIGINT or SIGTERM.
    pub fn on_signal(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            let notified = this.trigger();
            tracing::info!(notified, "Shutdown triggered by signal");
        })
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
