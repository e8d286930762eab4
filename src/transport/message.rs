//! Message Types for the In-Memory Transport
//!
//! Defines the envelope carried through the queue and the two transient
//! context views handed to pipes: one per send call, one per delivery
//! attempt.

use crate::core::cancel::CancelToken;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque, process-wide-unique message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Envelope carried through the queue
///
/// Everything except the delivery count is immutable after creation. The
/// delivery count records how many delivery attempts have failed so far and
/// only ever grows.
#[derive(Debug, Clone)]
pub struct TransportMessage {
    id: MessageId,
    body: Bytes,
    content_type: String,
    delivery_count: u32,
}

impl TransportMessage {
    pub(crate) fn new(id: MessageId, body: Bytes, content_type: String) -> Self {
        Self {
            id,
            body,
            content_type,
            delivery_count: 0,
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Number of failed delivery attempts so far
    pub fn delivery_count(&self) -> u32 {
        self.delivery_count
    }

    /// Record one more failed delivery attempt
    pub(crate) fn mark_redelivered(&mut self) {
        self.delivery_count += 1;
    }
}

/// Per-send-call context handed to the enrichment pipe
///
/// The pipe may replace the body and assign an explicit message id or
/// content type before the message is built. Discarded once the send call
/// resolves.
#[derive(Debug)]
pub struct SendContext {
    body: Bytes,
    message_id: Option<MessageId>,
    content_type: Option<String>,
    cancel: CancelToken,
}

impl SendContext {
    pub(crate) fn new(body: Bytes, cancel: CancelToken) -> Self {
        Self {
            body,
            message_id: None,
            content_type: None,
            cancel,
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    /// Explicitly assigned message id, if any
    ///
    /// Left unset, the transport generates one after enrichment.
    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }

    pub fn set_message_id(&mut self, message_id: MessageId) {
        self.message_id = Some(message_id);
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = Some(content_type.into());
    }

    /// Token bounding the whole send call
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

/// Per-delivery-attempt context handed to the dispatch pipe
///
/// Lives for exactly one attempt; on failure the message is taken back out
/// of the context for redelivery.
#[derive(Debug)]
pub struct ReceiveContext {
    input_address: Arc<str>,
    message: TransportMessage,
}

impl ReceiveContext {
    pub(crate) fn new(input_address: Arc<str>, message: TransportMessage) -> Self {
        Self {
            input_address,
            message,
        }
    }

    /// Address tag of the transport this delivery originated from
    pub fn input_address(&self) -> &str {
        &self.input_address
    }

    pub fn message(&self) -> &TransportMessage {
        &self.message
    }

    pub(crate) fn into_message(self) -> TransportMessage {
        self.message
    }
}
