//! Transport Error Types

use crate::transport::traits::PipeError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("enqueue was cancelled before the message was admitted")]
    EnqueueCancelled,

    #[error("queue is completed and no longer accepts messages")]
    QueueCompleted,

    #[error("invalid partition count: {count} (must be at least 1)")]
    InvalidPartitionCount { count: usize },

    #[error("send pipeline failed: {source}")]
    SendPipelineFault {
        #[source]
        source: PipeError,
    },

    #[error("receive loop has already been started")]
    ReceiveLoopAlreadyStarted,

    #[error("transport has been disposed")]
    TransportDisposed,
}
