//! # Shutdown Signal
//!
//! Cooperative cancellation shared by the link activities. One
//! [`ShutdownSignal`] per session triggers; every suspension point holds a
//! [`Shutdown`] and selects on [`Shutdown::cancelled`].

use std::sync::Arc;

use tokio::sync::watch;

/// Trigger side of a shutdown signal
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Create an untriggered signal
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown; idempotent
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether shutdown was requested
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Create a listener for this signal
    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            rx: self.tx.subscribe(),
        }
    }
}

/// Listener side of a shutdown signal
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

impl Shutdown {
    /// Whether shutdown was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested or every trigger handle is gone
    ///
    /// Cancel-safe, so it can sit in a `tokio::select!` next to I/O.
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|&cancelled| cancelled).await;
    }
}
