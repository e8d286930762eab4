//! Traits at the transport's seams
//!
//! The transport treats the handler chain, id generation, and send
//! observation as external collaborators. Everything here is the boundary
//! those collaborators implement.

use crate::transport::error::TransportError;
use crate::transport::message::{MessageId, SendContext, TransportMessage};
use async_trait::async_trait;

/// Failure raised by a pipe or an observer hook
pub type PipeError = Box<dyn std::error::Error + Send + Sync>;

/// Ordered handler chain invoked with a context
///
/// The same abstraction serves both directions: with [`SendContext`] it
/// enriches outbound messages, with
/// [`ReceiveContext`](crate::transport::message::ReceiveContext) it
/// dispatches inbound deliveries. A pipe may mutate the context or fail.
#[async_trait]
pub trait Pipe<C: Send>: Send + Sync {
    async fn send(&self, context: &mut C) -> Result<(), PipeError>;
}

/// Pipe that accepts every context untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyPipe;

#[async_trait]
impl<C: Send> Pipe<C> for EmptyPipe {
    async fn send(&self, _context: &mut C) -> Result<(), PipeError> {
        Ok(())
    }
}

/// Source of process-wide-unique message identifiers
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> MessageId;
}

/// Default generator backed by random v4 UUIDs
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn next_id(&self) -> MessageId {
        MessageId::new()
    }
}

/// Listener notified of send lifecycle events
///
/// All hooks default to no-ops so implementors only override the events
/// they care about. Hooks run as part of the send call: a `pre_send`
/// failure fails the send, while `post_send` and `send_fault` failures are
/// logged and swallowed.
#[async_trait]
pub trait SendObserver: Send + Sync {
    /// Invoked after enrichment and id resolution, before the message
    /// becomes visible to any consumer
    async fn pre_send(&self, _context: &SendContext) -> Result<(), PipeError> {
        Ok(())
    }

    /// Invoked after the message has been published to the queue
    async fn post_send(&self, _message: &TransportMessage) -> Result<(), PipeError> {
        Ok(())
    }

    /// Invoked when the send pipeline fails at any step before publication
    async fn send_fault(
        &self,
        _context: &SendContext,
        _error: &TransportError,
    ) -> Result<(), PipeError> {
        Ok(())
    }
}
