//! Receive Loop
//!
//! A pool of workers drains the queue partitions and dispatches each
//! claimed message to the consumer pipe. Dispatch failures are contained:
//! the message's delivery count is incremented and it is requeued, and the
//! loop keeps running. Cancellation completes the queue, after which the
//! workers drain what is left and stop.

use crate::core::cancel::CancelToken;
use crate::transport::error::TransportError;
use crate::transport::internal::{MessagePartition, MessageQueue};
use crate::transport::message::ReceiveContext;
use crate::transport::traits::Pipe;
use crate::transport::TransportResult;
use futures::future::join_all;
use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;

/// Lifecycle of the receive loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveLoopState {
    NotStarted,
    Running,
    /// The queue has been completed; workers are finishing claimed and
    /// residual messages
    Draining,
    Stopped,
}

pub(crate) type StateCell = Arc<RwLock<ReceiveLoopState>>;

pub(crate) fn new_state_cell() -> StateCell {
    Arc::new(RwLock::new(ReceiveLoopState::NotStarted))
}

/// Awaitable handle over a started receive loop
///
/// Resolving [`stopped`](Self::stopped) means every worker has finished and
/// no further delivery will happen.
pub struct ReceiveHandle {
    workers: Vec<JoinHandle<()>>,
    watcher: JoinHandle<()>,
    state: StateCell,
}

impl ReceiveHandle {
    pub fn state(&self) -> ReceiveLoopState {
        *self.state.read().unwrap()
    }

    /// Wait until every worker has finished
    pub async fn stopped(self) {
        for joined in join_all(self.workers).await {
            if let Err(error) = joined {
                log::error!("receive worker terminated abnormally: {error}");
            }
        }

        // The watcher idles on the cancel token; it has nothing left to do
        // once the workers are gone
        self.watcher.abort();

        *self.state.write().unwrap() = ReceiveLoopState::Stopped;
    }
}

/// Default worker count: one per unit of available parallelism
fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Start the worker pool and the cancellation watcher
///
/// Must be called from within a tokio runtime. Fails with
/// `ReceiveLoopAlreadyStarted` if the loop has been started before.
pub(crate) fn start(
    input_address: Arc<str>,
    queue: Arc<MessageQueue>,
    state: StateCell,
    pipe: Arc<dyn Pipe<ReceiveContext>>,
    cancel: CancelToken,
    concurrency: Option<usize>,
) -> TransportResult<ReceiveHandle> {
    {
        let mut current = state.write().unwrap();
        if *current != ReceiveLoopState::NotStarted {
            return Err(TransportError::ReceiveLoopAlreadyStarted);
        }
        *current = ReceiveLoopState::Running;
    }

    let worker_count = concurrency.unwrap_or_else(default_concurrency);
    let partitions = queue.partitions(worker_count)?;

    log::debug!(
        "starting receive loop on '{input_address}' with {worker_count} workers"
    );

    let watcher = tokio::spawn(watch_cancellation(
        cancel.clone(),
        Arc::clone(&queue),
        Arc::clone(&state),
    ));

    let workers = partitions
        .into_iter()
        .enumerate()
        .map(|(worker_id, partition)| {
            tokio::spawn(run_worker(
                worker_id,
                input_address.clone(),
                Arc::clone(&queue),
                partition,
                Arc::clone(&pipe),
                cancel.clone(),
            ))
        })
        .collect();

    Ok(ReceiveHandle {
        workers,
        watcher,
        state,
    })
}

/// Bind external cancellation to queue completion
///
/// Completing the queue stops future admissions while letting workers drain
/// everything already queued; it never aborts a claimed message.
async fn watch_cancellation(cancel: CancelToken, queue: Arc<MessageQueue>, state: StateCell) {
    cancel.cancelled().await;

    {
        let mut current = state.write().unwrap();
        if *current == ReceiveLoopState::Running {
            *current = ReceiveLoopState::Draining;
        }
    }

    queue.complete();
}

/// Drain one partition until the queue is complete and empty
async fn run_worker(
    worker_id: usize,
    input_address: Arc<str>,
    queue: Arc<MessageQueue>,
    partition: MessagePartition,
    pipe: Arc<dyn Pipe<ReceiveContext>>,
    cancel: CancelToken,
) {
    while let Some(message) = partition.next().await {
        // A claimed message is always dispatched to completion, even when
        // cancellation fires mid-flight; the token only stops future claims
        let mut context = ReceiveContext::new(input_address.clone(), message);

        match pipe.send(&mut context).await {
            Ok(()) => {}
            Err(error) => {
                let mut message = context.into_message();
                message.mark_redelivered();

                let message_id = message.id();
                let delivery_count = message.delivery_count();
                log::error!(
                    "delivery of message {message_id} on '{input_address}' failed \
                     (delivery count {delivery_count}): {error}"
                );

                if let Err(requeue_error) = queue.enqueue(message, &cancel).await {
                    // Known limitation: a redelivery that races cancellation
                    // or queue completion loses the message
                    log::warn!(
                        "message {message_id} lost: could not requeue after failed \
                         delivery: {requeue_error}"
                    );
                }
            }
        }
    }

    log::trace!("receive worker {worker_id} on '{input_address}' finished");
}
