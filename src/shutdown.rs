//! Shutdown signal for asynchronous tasks.

use tokio::sync::broadcast;

/// Listens for the server shutdown signal.
///
/// The signal is the sender being dropped, so it is observed at most once. After
/// that [`Shutdown::recv`] returns immediately.
#[derive(Debug)]
pub(crate) struct Shutdown {
    // True if the shutdown signal has been received
    shutdown: bool,

    // Channel's receiver for the shutdown signal
    notify: broadcast::Receiver<()>,
}

impl Shutdown {
    /// Wraps the receiving half of the server's shutdown channel.
    pub(crate) fn new(notify: broadcast::Receiver<()>) -> Self {
        Self {
            shutdown: false,
            notify,
        }
    }

    /// Returns `true` if a shutdown signal has been received.
    pub(crate) fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    /// Blocks and waits until the shutdown signal is received, if one has
    /// not been received.
    pub(crate) async fn recv(&mut self) {
        if !self.shutdown {
            // Either a value or a closed channel means shutdown
            let _ = self.notify.recv().await;
            self.shutdown = true;
        }
    }
}
