//! Shutdown coordination for the gateway host.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// The server, the config update task and the signal loop all subscribe;
/// one `trigger` stops them together.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell every subscriber to stop. Triggering twice is harmless.
    pub fn trigger(&self, reason: &str) {
        tracing::info!(reason, subscribers = self.tx.receiver_count(), "Shutdown triggered");
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once `rx` sees a shutdown, or once the coordinator is gone.
pub async fn wait(mut rx: broadcast::Receiver<()>) {
    // Lagged cannot happen with a single message; Closed means nobody can
    // trigger any more, which is also a reason to stop.
    let _ = rx.recv().await;
}
