//! Transport adapter contract.
//!
//! The [`Transport`] trait is the seam between the connection core and the
//! underlying socket machinery (WebSocket upgrade, TLS, frame envelopes are
//! all the implementor's business). The core drives it with `open`/`send`/
//! `close` and consumes its event stream via [`Transport::recv`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sio_core::error::SioResult;

/// Handshake metadata delivered with [`TransportEvent::Opened`].
///
/// Socket.IO 0.9 performs its handshake before the socket upgrade, so the
/// session id is known by the time the connection opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Server-assigned session identifier.
    #[serde(rename = "sessionId")]
    pub session_id: String,
    /// Server-advertised heartbeat timeout in milliseconds, if any.
    /// Overrides the client-configured value when present.
    #[serde(rename = "heartbeatTimeout", default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_timeout_ms: Option<u64>,
}

impl Handshake {
    /// A handshake carrying only a session id.
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            heartbeat_timeout_ms: None,
        }
    }
}

/// Events surfaced by a transport to the connection core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and the handshake completed.
    Opened(Handshake),
    /// A raw inbound frame (one complete Socket.IO packet).
    Message(String),
    /// The remote end closed the connection (cleanly or not).
    Closed,
    /// The transport hit an error it cannot recover from.
    Failed(String),
}

/// A duplex frame transport for the Socket.IO protocol.
///
/// Implementations shuttle complete text frames; one `send` transmits one
/// frame, one [`recv`](Transport::recv) yields one event.
///
/// # Cancel safety
///
/// `recv` **must** be cancel-safe: it is polled inside the client's
/// `tokio::select!` loop and may be cancelled before completion without
/// losing an event. Channel-backed implementations are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Initiate a connection to the given URL.
    ///
    /// Asynchronous in effect: a successful return means the attempt was
    /// started, not that the connection is up. Completion is reported via
    /// [`TransportEvent::Opened`] or [`TransportEvent::Failed`].
    async fn open(&mut self, url: &str) -> SioResult<()>;

    /// Write one outbound frame, best-effort.
    ///
    /// A delivery failure may also surface later as a
    /// [`TransportEvent::Failed`] instead of an error here.
    async fn send(&mut self, frame: String) -> SioResult<()>;

    /// Receive the next transport event.
    ///
    /// Returns `None` once the event stream is exhausted; the core treats
    /// that as a close.
    async fn recv(&mut self) -> Option<TransportEvent>;

    /// Tear down the connection. Must be safe to call when not open.
    async fn close(&mut self) -> SioResult<()>;
}
