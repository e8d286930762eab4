//! membus — an in-process, non-durable transport for a message bus.
//!
//! Messages accepted for delivery are held in memory and dispatched in
//! parallel to a consumer pipeline. Nothing survives a process restart.
//! See the [`transport`] module for the architecture overview.

pub mod core;
pub mod transport;
