//! Client events, connection state, and the delegate contract.
//!
//! Internal transitions are translated into [`ClientEvent`]s and dispatched
//! through a broadcast-based [`EventDispatcher`]. Callback-style consumers
//! can instead implement [`ClientDelegate`] and attach it with
//! [`spawn_delegate`], which pumps one subscription serially so no two
//! callbacks for the same client ever run concurrently.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Connection state of a client instance.
///
/// Exactly one holds at any instant; all transitions happen on the client's
/// actor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying to connect.
    Disconnected,
    /// Attempting to establish a connection.
    Connecting,
    /// Connected with a live session.
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Why a client transitioned to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The caller invoked `disconnect()`.
    Requested,
    /// The connect watchdog fired before the handshake completed.
    ConnectTimeout,
    /// The heartbeat watchdog fired.
    HeartbeatTimeout,
    /// The transport reported a remote close.
    TransportClosed,
    /// The transport reported an error.
    TransportFailure,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requested => write!(f, "requested"),
            Self::ConnectTimeout => write!(f, "connect timeout"),
            Self::HeartbeatTimeout => write!(f, "heartbeat timeout"),
            Self::TransportClosed => write!(f, "transport closed"),
            Self::TransportFailure => write!(f, "transport failure"),
        }
    }
}

/// A non-recoverable condition surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Connect attempt timed out and retry is disabled.
    ConnectTimeout,
    /// Heartbeat timed out and retry is disabled.
    HeartbeatTimeout,
    /// The transport reported an error.
    Transport(String),
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectTimeout => write!(f, "connect attempt timed out"),
            Self::HeartbeatTimeout => write!(f, "heartbeat timed out"),
            Self::Transport(e) => write!(f, "transport failure: {e}"),
        }
    }
}

/// Events emitted by a client, at most once per logical transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The connection is usable and a session is established.
    Connected {
        /// Server-assigned session identifier.
        session_id: String,
    },
    /// The connection was lost or explicitly closed.
    Disconnected {
        /// What ended the session.
        reason: DisconnectReason,
    },
    /// An inbound application message.
    Message {
        /// Opaque payload; decoding JSON is the receiver's exercise.
        payload: String,
        /// Whether the sender framed the payload as JSON.
        is_json: bool,
    },
    /// A message was handed off to the transport (not a delivery receipt).
    MessageSent { payload: String, is_json: bool },
    /// A transport error or an exhausted retry policy.
    Failure {
        /// The failure category.
        kind: FailureKind,
    },
}

impl ClientEvent {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Disconnected { .. } => "disconnected",
            Self::Message { .. } => "message",
            Self::MessageSent { .. } => "message-sent",
            Self::Failure { .. } => "failure",
        }
    }
}

/// Broadcast-based event dispatcher for decoupled event handling.
///
/// Uses tokio::broadcast channels so multiple consumers can independently
/// receive and process events without blocking each other. Events are sent
/// from the client's single actor task, so each subscriber observes every
/// event exactly once and in transition order.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<ClientEvent>,
}

impl EventDispatcher {
    /// Create a new EventDispatcher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive client events.
    ///
    /// Returns a broadcast receiver. Slow consumers that fall behind
    /// will receive a RecvError::Lagged and may miss events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    /// Dispatch an event to all active subscribers.
    pub fn dispatch(&self, event: ClientEvent) {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(count) => {
                debug!("dispatched {kind} to {count} subscriber(s)");
            }
            Err(_) => {
                // No active receivers -- fine during startup/shutdown
                debug!("no subscribers for event {kind}");
            }
        }
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Callback contract for delegate-style consumers.
///
/// `on_message_sent` and `on_failure` are optional; the default
/// implementations do nothing.
pub trait ClientDelegate: Send + Sync + 'static {
    /// Connection usable, session established.
    fn on_connect(&self, session_id: &str);

    /// Connection lost or explicitly closed.
    fn on_disconnect(&self, reason: DisconnectReason);

    /// Inbound application message. The payload is always delivered as a
    /// string, even when it was sent as JSON; decoding is the receiver's
    /// responsibility.
    fn on_message(&self, payload: &str, is_json: bool);

    /// A message was handed to the transport. Not delivery confirmation.
    fn on_message_sent(&self, _payload: &str, _is_json: bool) {}

    /// A transport error or exhausted retry policy.
    fn on_failure(&self, _failure: &FailureKind) {}
}

/// Pump a subscription into a delegate on a dedicated task.
///
/// Callbacks are invoked serially and at most once per event. The task exits
/// when the dispatcher (and therefore the client) is dropped.
pub fn spawn_delegate(
    dispatcher: &EventDispatcher,
    delegate: Arc<dyn ClientDelegate>,
) -> tokio::task::JoinHandle<()> {
    let mut rx = dispatcher.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ClientEvent::Connected { session_id }) => delegate.on_connect(&session_id),
                Ok(ClientEvent::Disconnected { reason }) => delegate.on_disconnect(reason),
                Ok(ClientEvent::Message { payload, is_json }) => {
                    delegate.on_message(&payload, is_json)
                }
                Ok(ClientEvent::MessageSent { payload, is_json }) => {
                    delegate.on_message_sent(&payload, is_json)
                }
                Ok(ClientEvent::Failure { kind }) => delegate.on_failure(&kind),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("delegate lagged, {missed} event(s) dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Disconnected.to_string(), "disconnected");
    }

    #[test]
    fn test_disconnect_reason_display() {
        assert_eq!(DisconnectReason::Requested.to_string(), "requested");
        assert_eq!(
            DisconnectReason::HeartbeatTimeout.to_string(),
            "heartbeat timeout"
        );
    }

    #[tokio::test]
    async fn test_event_dispatcher() {
        let dispatcher = EventDispatcher::new(16);
        let mut rx = dispatcher.subscribe();

        dispatcher.dispatch(ClientEvent::Connected {
            session_id: "abc123".into(),
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            ClientEvent::Connected {
                session_id: "abc123".into()
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_without_subscribers_is_harmless() {
        let dispatcher = EventDispatcher::new(16);
        dispatcher.dispatch(ClientEvent::Disconnected {
            reason: DisconnectReason::Requested,
        });
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[derive(Default)]
    struct RecordingDelegate {
        log: Mutex<Vec<String>>,
    }

    impl ClientDelegate for RecordingDelegate {
        fn on_connect(&self, session_id: &str) {
            self.log.lock().unwrap().push(format!("connect:{session_id}"));
        }
        fn on_disconnect(&self, reason: DisconnectReason) {
            self.log.lock().unwrap().push(format!("disconnect:{reason}"));
        }
        fn on_message(&self, payload: &str, is_json: bool) {
            self.log
                .lock()
                .unwrap()
                .push(format!("message:{payload}:{is_json}"));
        }
    }

    #[tokio::test]
    async fn test_delegate_receives_events_in_order() {
        let dispatcher = EventDispatcher::new(16);
        let delegate = Arc::new(RecordingDelegate::default());
        let handle = spawn_delegate(&dispatcher, delegate.clone());

        dispatcher.dispatch(ClientEvent::Connected {
            session_id: "s1".into(),
        });
        dispatcher.dispatch(ClientEvent::Message {
            payload: "hello".into(),
            is_json: false,
        });
        dispatcher.dispatch(ClientEvent::Disconnected {
            reason: DisconnectReason::Requested,
        });

        // Dropping the dispatcher closes the channel; the pump drains what
        // it already received, then exits.
        drop(dispatcher);
        handle.await.unwrap();

        let log = delegate.log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                "connect:s1".to_string(),
                "message:hello:false".to_string(),
                "disconnect:requested".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_optional_callbacks_default_to_noop() {
        // A delegate implementing only the required methods still compiles
        // and swallows the optional events.
        let dispatcher = EventDispatcher::new(16);
        let delegate = Arc::new(RecordingDelegate::default());
        let handle = spawn_delegate(&dispatcher, delegate.clone());

        dispatcher.dispatch(ClientEvent::MessageSent {
            payload: "x".into(),
            is_json: false,
        });
        dispatcher.dispatch(ClientEvent::Failure {
            kind: FailureKind::ConnectTimeout,
        });

        drop(dispatcher);
        handle.await.unwrap();
        assert!(delegate.log.lock().unwrap().is_empty());
    }
}
