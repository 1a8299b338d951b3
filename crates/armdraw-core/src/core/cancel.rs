//! Cooperative cancellation token handed to a run at start

use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable cancellation flag
///
/// The worker polls [`CancelToken::is_cancelled`] once per point and once per
/// interpolation sub-step. Cancelling never interrupts a command in flight.
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request cancellation; idempotent
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// True once any clone has called [`CancelToken::cancel`]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
