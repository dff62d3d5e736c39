//! Socket.IO 0.9-era client core.
//!
//! This crate provides the connection lifecycle and reliability logic of a
//! Socket.IO client:
//! - Connection state machine (connect/disconnect/reconnect) driven by a
//!   single actor task
//! - Connect and heartbeat watchdog timers with race-free cancellation
//! - Offline message queue that buffers sends issued while disconnected
//!   and flushes them in order on connect
//! - Event dispatching via tokio broadcast channels, with an optional
//!   delegate trait for callback-style consumers
//!
//! Byte-level socket I/O is delegated to a [`Transport`] implementation;
//! message payloads are opaque strings carrying an `is_json` flag and are
//! never parsed by this crate.

pub mod client;
pub mod endpoint;
pub mod events;
pub mod monitor;
pub mod packet;
pub mod queue;
pub mod transport;

// Re-export key types
pub use client::SocketIoClient;
pub use endpoint::Endpoint;
pub use events::{
    spawn_delegate, ClientDelegate, ClientEvent, ConnectionState, DisconnectReason,
    EventDispatcher, FailureKind,
};
pub use queue::{InMemoryQueue, Message, MessageQueue};
pub use transport::{Handshake, Transport, TransportEvent};
