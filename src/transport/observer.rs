//! Send Observer Registry
//!
//! Broadcasts send lifecycle events to a dynamic set of observers. Every
//! broadcast operates on a snapshot of the observers connected at broadcast
//! start, so connecting or disconnecting during an in-flight broadcast is
//! safe and never invalidates it.

use crate::transport::error::TransportError;
use crate::transport::message::{SendContext, TransportMessage};
use crate::transport::traits::SendObserver;
use crate::transport::TransportResult;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

pub(crate) struct SendObserverRegistry {
    next_observer_id: AtomicU64,
    observers: RwLock<HashMap<u64, Arc<dyn SendObserver>>>,
}

impl SendObserverRegistry {
    pub(crate) fn new() -> Self {
        Self {
            next_observer_id: AtomicU64::new(0),
            observers: RwLock::new(HashMap::new()),
        }
    }

    /// Connect an observer, returning a revocable handle
    pub(crate) fn connect(self: &Arc<Self>, observer: Arc<dyn SendObserver>) -> ObserverHandle {
        let observer_id = self.next_observer_id.fetch_add(1, Ordering::SeqCst);
        self.observers
            .write()
            .unwrap()
            .insert(observer_id, observer);

        ObserverHandle {
            observer_id,
            registry: Arc::downgrade(self),
        }
    }

    fn disconnect(&self, observer_id: u64) {
        self.observers.write().unwrap().remove(&observer_id);
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.read().unwrap().len()
    }

    /// Observers connected right now; broadcasts never hold the lock while
    /// hooks run
    fn snapshot(&self) -> Vec<Arc<dyn SendObserver>> {
        self.observers.read().unwrap().values().cloned().collect()
    }

    /// Run every pre-send hook to completion before the message may become
    /// visible to consumers
    ///
    /// The first hook failure fails the send; additional failures from the
    /// same fan-out are logged.
    pub(crate) async fn notify_pre_send(&self, context: &SendContext) -> TransportResult<()> {
        let snapshot = self.snapshot();
        let results = join_all(
            snapshot
                .iter()
                .map(|observer| observer.pre_send(context)),
        )
        .await;

        let mut failures = results.into_iter().filter_map(Result::err);
        if let Some(first) = failures.next() {
            for error in failures {
                log::warn!("additional pre-send observer failure: {error}");
            }
            return Err(TransportError::SendPipelineFault { source: first });
        }

        Ok(())
    }

    /// Fan out the published message to every post-send hook
    ///
    /// Hook failures are logged; the message is already visible, so they
    /// cannot fail the send.
    pub(crate) async fn notify_post_send(&self, message: &TransportMessage) {
        let snapshot = self.snapshot();
        let results = join_all(
            snapshot
                .iter()
                .map(|observer| observer.post_send(message)),
        )
        .await;

        let message_id = message.id();
        for error in results.into_iter().filter_map(Result::err) {
            log::warn!("post-send observer failure for message {message_id}: {error}");
        }
    }

    /// Best-effort fault notification; hook failures are logged, never
    /// re-raised
    pub(crate) async fn notify_send_fault(&self, context: &SendContext, error: &TransportError) {
        let snapshot = self.snapshot();
        let results = join_all(
            snapshot
                .iter()
                .map(|observer| observer.send_fault(context, error)),
        )
        .await;

        for failure in results.into_iter().filter_map(Result::err) {
            log::warn!("send-fault observer failure: {failure}");
        }
    }
}

/// Revocable subscription token returned by observer connection
///
/// Dropping the handle leaves the observer connected; call
/// [`disconnect`](Self::disconnect) to remove it.
pub struct ObserverHandle {
    observer_id: u64,
    registry: Weak<SendObserverRegistry>,
}

impl ObserverHandle {
    /// Remove the observer from the registry
    ///
    /// In-flight broadcasts that already snapshotted the observer still
    /// complete against it.
    pub fn disconnect(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.disconnect(self.observer_id);
        }
    }
}
