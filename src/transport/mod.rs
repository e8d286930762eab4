//! In-Memory Transport Component
//!
//! A non-durable, in-process transport moving messages between a producer
//! side and a pool of parallel consumers. Messages live in memory only;
//! nothing survives a process restart.
//!
//! # Overview
//!
//! The transport accepts outbound messages, holds them in a concurrent FIFO
//! queue, and delivers them to a consumer pipeline ("pipe") on a pool of
//! workers. Key properties:
//!
//! - **Parallel consumption**: the queue fans out into N cooperating
//!   partitions; each message is handed to exactly one worker
//! - **At-least-once delivery**: a failed dispatch increments the message's
//!   delivery count and requeues it; retries are unbounded
//! - **Observed sends**: lifecycle observers see every message before it
//!   becomes visible to consumers, after it is published, and on failure
//! - **Cooperative shutdown**: cancelling the receive token completes the
//!   queue; queued messages are drained before the loop stops
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  send   ┌─────────────────────────────┐
//! │ Producer ├────────►│       InMemoryTransport     │
//! └──────────┘         │  ┌───────────────────────┐  │
//!      ▲               │  │     MessageQueue      │  │
//!      │ observers     │  │  ┌───┬───┬───┬───┐   │  │
//! pre/post/fault       │  │  │ m │ m │ m │ m │   │  │
//!                      │  │  └───┴───┴───┴───┘   │  │
//!                      │  └───────┬───────────────┘  │
//!                      └──────────┼──────────────────┘
//!                     partition 0 │ partition 1 │ ... │ partition N-1
//!                          ┌──────┴───┐  ┌──────┴───┐  ┌──────────┐
//!                          │ Worker 0 │  │ Worker 1 │  │ Worker N │
//!                          └──────┬───┘  └──────┬───┘  └────┬─────┘
//!                                 ▼             ▼           ▼
//!                               pipe          pipe        pipe
//!                                 │ failure: delivery_count += 1, requeue
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use membus::core::cancel::CancelToken;
//! use membus::transport::api::{EmptyPipe, InMemoryTransport};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = InMemoryTransport::new("loopback");
//! let cancel = CancelToken::new();
//!
//! // Start draining the queue into the consumer pipe
//! let handle = transport.start_receiving(Arc::new(EmptyPipe), cancel.clone())?;
//!
//! // Publish a message (EmptyPipe performs no enrichment)
//! let message_id = transport
//!     .send(Bytes::from_static(b"hello"), &EmptyPipe, cancel.clone())
//!     .await?;
//! println!("sent {message_id}");
//!
//! // Cancel and wait for the drain to finish
//! cancel.cancel();
//! handle.stopped().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod in_memory;
mod internal;
mod message;
mod observer;
mod receiver;
mod traits;

pub use error::TransportError;
pub use in_memory::{InMemoryTransport, TransportOptions, DEFAULT_CONTENT_TYPE};
pub use message::{MessageId, ReceiveContext, SendContext, TransportMessage};
pub use observer::ObserverHandle;
pub use receiver::{ReceiveHandle, ReceiveLoopState};
pub use traits::{EmptyPipe, IdGenerator, Pipe, PipeError, SendObserver, UuidIdGenerator};

pub mod api;

pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests;
