//! Public API for the in-memory transport
//!
//! This module provides the complete public API for the transport.
//! External modules should import from here rather than directly from
//! internal modules. See the module documentation for usage examples and
//! architecture details.

// The transport object and its configuration
pub use crate::transport::in_memory::{InMemoryTransport, TransportOptions, DEFAULT_CONTENT_TYPE};

// Message types and delivery contexts
pub use crate::transport::message::{MessageId, ReceiveContext, SendContext, TransportMessage};

// Receive loop control
pub use crate::transport::receiver::{ReceiveHandle, ReceiveLoopState};

// Observer connection
pub use crate::transport::observer::ObserverHandle;

// Collaborator seams
pub use crate::transport::traits::{
    EmptyPipe, IdGenerator, Pipe, PipeError, SendObserver, UuidIdGenerator,
};

// Error handling
pub use crate::transport::error::TransportError;
pub use crate::transport::TransportResult;

// Cancellation is re-exported for convenience; it lives in the core module
pub use crate::core::cancel::CancelToken;
