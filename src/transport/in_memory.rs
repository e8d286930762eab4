//! InMemoryTransport - the transport object
//!
//! Combines the concurrent queue, the receive worker pool, the observed
//! send path, and disposal into one object. The input address is an opaque
//! tag used for diagnostics only; it plays no part in routing.

use crate::core::cancel::CancelToken;
use crate::transport::error::TransportError;
use crate::transport::internal::MessageQueue;
use crate::transport::message::{MessageId, ReceiveContext, SendContext, TransportMessage};
use crate::transport::observer::{ObserverHandle, SendObserverRegistry};
use crate::transport::receiver::{self, ReceiveHandle, ReceiveLoopState, StateCell};
use crate::transport::traits::{IdGenerator, Pipe, SendObserver, UuidIdGenerator};
use crate::transport::TransportResult;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Content type assigned when the enrichment pipe does not set one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Tuning knobs for a transport instance
///
/// The defaults match the reference behavior: an unbounded queue and one
/// receive worker per unit of available parallelism.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportOptions {
    /// Maximum number of queued messages; `None` means unbounded. Producers
    /// suspend on enqueue while a bounded queue is at capacity.
    pub queue_capacity: Option<usize>,
    /// Number of receive workers; `None` derives the count from available
    /// parallelism at start time.
    pub receive_concurrency: Option<usize>,
}

/// In-process, non-durable message transport
///
/// Thread-safe: sends may run concurrently with each other and with active
/// receives without additional coordination. The queue is the sole
/// synchronization point between the two sides.
pub struct InMemoryTransport {
    input_address: Arc<str>,
    options: TransportOptions,
    queue: Arc<MessageQueue>,
    observers: Arc<SendObserverRegistry>,
    id_generator: Arc<dyn IdGenerator>,
    receive_state: StateCell,
    disposed: AtomicBool,
}

impl InMemoryTransport {
    /// Create a transport with default options
    pub fn new(input_address: impl Into<String>) -> Self {
        Self::with_options(input_address, TransportOptions::default())
    }

    /// Create a transport with explicit options
    pub fn with_options(input_address: impl Into<String>, options: TransportOptions) -> Self {
        Self {
            input_address: Arc::from(input_address.into()),
            queue: Arc::new(MessageQueue::new(options.queue_capacity)),
            options,
            observers: Arc::new(SendObserverRegistry::new()),
            id_generator: Arc::new(UuidIdGenerator),
            receive_state: receiver::new_state_cell(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Replace the message id source
    pub fn with_id_generator(mut self, id_generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = id_generator;
        self
    }

    pub fn input_address(&self) -> &str {
        &self.input_address
    }

    /// Number of messages currently awaiting delivery
    pub fn pending_message_count(&self) -> usize {
        self.queue.len()
    }

    pub fn receive_state(&self) -> ReceiveLoopState {
        *self.receive_state.read().unwrap()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.observer_count()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Connect a send lifecycle observer
    pub fn connect_send_observer(&self, observer: Arc<dyn SendObserver>) -> ObserverHandle {
        self.observers.connect(observer)
    }

    /// Start delivering queued messages to `pipe` on a pool of workers
    ///
    /// Firing `cancel` completes the queue: no further enqueue succeeds,
    /// already-queued messages are drained, and the returned handle resolves
    /// once every worker has finished. Must be called from within a tokio
    /// runtime.
    pub fn start_receiving(
        &self,
        pipe: Arc<dyn Pipe<ReceiveContext>>,
        cancel: CancelToken,
    ) -> TransportResult<ReceiveHandle> {
        if self.is_disposed() {
            return Err(TransportError::TransportDisposed);
        }

        receiver::start(
            self.input_address.clone(),
            Arc::clone(&self.queue),
            Arc::clone(&self.receive_state),
            pipe,
            cancel,
            self.options.receive_concurrency,
        )
    }

    /// Accept a message for delivery
    ///
    /// The pipe runs first and may enrich the context (id, content type,
    /// body). The resulting message becomes visible to consumers only after
    /// every pre-send observer hook has completed. On failure at any step
    /// before publication, observers are notified best-effort and the error
    /// is surfaced to the caller.
    pub async fn send(
        &self,
        body: impl Into<Bytes>,
        pipe: &dyn Pipe<SendContext>,
        cancel: CancelToken,
    ) -> TransportResult<MessageId> {
        if self.is_disposed() {
            return Err(TransportError::TransportDisposed);
        }

        let mut context = SendContext::new(body.into(), cancel);

        match self.send_inner(&mut context, pipe).await {
            Ok(message_id) => Ok(message_id),
            Err(error) => {
                self.observers.notify_send_fault(&context, &error).await;
                Err(error)
            }
        }
    }

    async fn send_inner(
        &self,
        context: &mut SendContext,
        pipe: &dyn Pipe<SendContext>,
    ) -> TransportResult<MessageId> {
        pipe.send(context)
            .await
            .map_err(|source| TransportError::SendPipelineFault { source })?;

        // An id assigned by the pipe wins over the generator
        let message_id = context
            .message_id()
            .unwrap_or_else(|| self.id_generator.next_id());
        context.set_message_id(message_id);

        self.observers.notify_pre_send(context).await?;

        let message = TransportMessage::new(
            message_id,
            context.body().clone(),
            context
                .content_type()
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string(),
        );

        self.queue
            .enqueue(message.clone(), context.cancel_token())
            .await?;

        self.observers.notify_post_send(&message).await;

        Ok(message_id)
    }

    /// Release the queue's resources
    ///
    /// Completes the queue and discards whatever is still buffered.
    /// Idempotent; must not be called concurrently with in-flight send or
    /// receive operations.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.queue.complete();
        let dropped = self.queue.drain();
        if dropped > 0 {
            let input_address = &self.input_address;
            log::debug!(
                "dropped {dropped} undelivered messages disposing transport '{input_address}'"
            );
        }
    }
}
