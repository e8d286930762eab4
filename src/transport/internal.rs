//! Internal MessageQueue implementation with cooperative fan-out
//!
//! The queue is the single synchronization point between the send path and
//! the receive workers. It is backed by an MPMC channel: cloning the
//! receiving side yields cooperating partitions that consume each message
//! exactly once. The sending side is held behind a lock so completion is an
//! explicit, irreversible state change rather than an accident of drop
//! order.

use crate::core::cancel::CancelToken;
use crate::transport::error::TransportError;
use crate::transport::message::TransportMessage;
use crate::transport::TransportResult;
use std::sync::RwLock;

/// Concurrent FIFO holding messages awaiting delivery
///
/// Invariants:
/// - a dequeued message is visible to exactly one partition until it is
///   explicitly requeued
/// - once [`complete`](Self::complete) has been called no new enqueue
///   succeeds, but messages already admitted are still drained
pub struct MessageQueue {
    /// Present until the queue is completed; every enqueue works on a clone
    sender: RwLock<Option<flume::Sender<TransportMessage>>>,
    receiver: flume::Receiver<TransportMessage>,
    capacity: Option<usize>,
}

impl MessageQueue {
    /// Create a queue; `None` means unbounded (the default configuration)
    pub fn new(capacity: Option<usize>) -> Self {
        let (sender, receiver) = match capacity {
            Some(bound) => flume::bounded(bound),
            None => flume::unbounded(),
        };

        Self {
            sender: RwLock::new(Some(sender)),
            receiver,
            capacity,
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of messages currently awaiting delivery
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Admit a message, suspending while a bounded queue is at capacity
    ///
    /// Fails with `EnqueueCancelled` if the token fires before admission and
    /// with `QueueCompleted` once the queue has been completed. An enqueue
    /// already suspended on capacity when `complete` is called may still be
    /// admitted; it is linearized as accepted before completion.
    pub async fn enqueue(
        &self,
        message: TransportMessage,
        cancel: &CancelToken,
    ) -> TransportResult<()> {
        if cancel.is_cancelled() {
            return Err(TransportError::EnqueueCancelled);
        }

        // Clone the sender out of the lock; the guard must not be held
        // across the suspension below
        let sender = {
            let guard = self.sender.read().unwrap();
            match guard.as_ref() {
                Some(sender) => sender.clone(),
                None => return Err(TransportError::QueueCompleted),
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(TransportError::EnqueueCancelled),
            sent = sender.send_async(message) => {
                sent.map_err(|_| TransportError::QueueCompleted)
            }
        }
    }

    /// Mark the queue complete
    ///
    /// Idempotent and irreversible. Consumers keep draining whatever is
    /// already queued; partition iteration ends once the queue is empty.
    pub fn complete(&self) {
        self.sender.write().unwrap().take();
    }

    pub fn is_completed(&self) -> bool {
        self.sender.read().unwrap().is_none()
    }

    /// Split the queue into `count` cooperating consuming views
    ///
    /// Partitions share the backing channel, so every message is consumed by
    /// exactly one of them; creating further partitions while others are
    /// live is safe.
    pub fn partitions(&self, count: usize) -> TransportResult<Vec<MessagePartition>> {
        if count < 1 {
            return Err(TransportError::InvalidPartitionCount { count });
        }

        Ok((0..count)
            .map(|_| MessagePartition {
                receiver: self.receiver.clone(),
            })
            .collect())
    }

    /// Discard all messages still queued, returning how many were dropped
    ///
    /// Used by disposal after completion; live partitions see the queue as
    /// empty afterwards.
    pub fn drain(&self) -> usize {
        let mut dropped = 0;
        while self.receiver.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

/// One cooperating consuming view over a shared [`MessageQueue`]
///
/// Single-pass: each call to [`next`](Self::next) claims the next available
/// message for this caller alone.
pub struct MessagePartition {
    receiver: flume::Receiver<TransportMessage>,
}

impl MessagePartition {
    /// Claim the next message, suspending until one is available
    ///
    /// Returns `None` once the queue is complete and empty, which ends the
    /// iteration.
    pub async fn next(&self) -> Option<TransportMessage> {
        self.receiver.recv_async().await.ok()
    }
}
