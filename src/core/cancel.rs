//! Cooperative Cancellation
//!
//! Provides a cloneable cancellation token used to stop blocking queue
//! operations and to initiate receive-loop shutdown. Cancellation is
//! cooperative: firing the token never preempts work that is already in
//! progress, it only stops operations that have not yet been admitted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

#[derive(Debug)]
struct CancelShared {
    cancelled: AtomicBool,
    notify_tx: broadcast::Sender<()>,
}

/// Cloneable cancellation token
///
/// All clones share the same state: cancelling any clone cancels them all.
/// A token can only transition once, from not-cancelled to cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    shared: Arc<CancelShared>,
}

impl CancelToken {
    pub fn new() -> Self {
        // Use a small buffered channel to avoid dropping the (single)
        // cancellation signal under subscriber churn
        let (notify_tx, _) = broadcast::channel(8);

        Self {
            shared: Arc::new(CancelShared {
                cancelled: AtomicBool::new(false),
                notify_tx,
            }),
        }
    }

    /// Fire the token
    ///
    /// Idempotent; later calls are no-ops.
    pub fn cancel(&self) {
        // Release ordering synchronizes-with the Acquire load in
        // is_cancelled(), so waiters observe the flag before the broadcast
        self.shared.cancelled.store(true, Ordering::Release);
        let _ = self.shared.notify_tx.send(());
    }

    /// Check whether the token has fired
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Wait until the token fires
    ///
    /// Returns immediately if the token has already fired.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }

        let mut notify_rx = self.shared.notify_tx.subscribe();

        // cancel() may have raced between the flag check and the subscribe;
        // the flag is authoritative, the channel is only a wakeup
        if self.is_cancelled() {
            return;
        }

        // The only message ever sent on this channel is the cancellation
        // signal, and the sender lives as long as the shared state, so any
        // outcome (value, lag, close) means the token has fired
        let _ = notify_rx.recv().await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_token_starts_not_cancelled() {
        let token = CancelToken::new();

        assert!(!token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_fires_waiters() {
        let token = CancelToken::new();
        let waiter = token.clone();

        let wait = tokio::spawn(async move { waiter.cancelled().await });

        token.cancel();
        assert!(token.is_cancelled());

        let resolved = timeout(Duration::from_millis(100), wait).await;
        assert!(resolved.is_ok(), "waiter should resolve after cancel");
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_after_fire() {
        let token = CancelToken::new();
        token.cancel();

        // Subscribing after the fact must not miss the signal
        let resolved = timeout(Duration::from_millis(100), token.cancelled()).await;
        assert!(resolved.is_ok());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();

        clone.cancel();

        assert!(token.is_cancelled());
        assert!(clone.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let token = CancelToken::new();

        token.cancel();
        token.cancel();

        assert!(token.is_cancelled());
    }
}
