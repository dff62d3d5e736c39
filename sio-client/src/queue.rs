//! Offline message queue.
//!
//! Sends issued while the client is not connected land here and are drained,
//! in original send order, when the connection comes up. The default backing
//! store is in-memory; implement [`MessageQueue`] to intercept enqueues and
//! persist them instead.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// An application message: an opaque payload tagged with a JSON flag.
///
/// The payload is never parsed by the client; `is_json` only records how the
/// caller wants the message framed on the wire. Serde support is for
/// [`MessageQueue`] implementations that persist queued messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The payload string (either _the_ string, or the caller's own
    /// JSON-encoded object).
    pub payload: String,
    /// Whether the payload is a JSON-encoded object.
    pub is_json: bool,
}

impl Message {
    /// Create a message.
    pub fn new(payload: impl Into<String>, is_json: bool) -> Self {
        Self {
            payload: payload.into(),
            is_json,
        }
    }
}

/// Ordered buffer of messages awaiting a connection.
///
/// The client owns its queue exclusively and calls it only from its actor
/// task, so implementations need no internal locking. The one contract that
/// matters: [`drain_all`](MessageQueue::drain_all) must yield messages in
/// original enqueue order.
pub trait MessageQueue: Send {
    /// Append a message to the back of the queue.
    fn enqueue(&mut self, message: Message);

    /// Remove and return every queued message, in enqueue order.
    fn drain_all(&mut self) -> Vec<Message>;

    /// Put messages back at the front of the queue, preserving their
    /// relative order ahead of anything enqueued since the drain.
    /// Used when a flush fails partway through.
    fn requeue_front(&mut self, messages: Vec<Message>);

    /// Number of queued messages.
    fn len(&self) -> usize;

    /// Whether the queue is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The default in-memory FIFO queue.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    items: VecDeque<Message>,
}

impl InMemoryQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MessageQueue for InMemoryQueue {
    fn enqueue(&mut self, message: Message) {
        debug!("queued offline message ({} bytes)", message.payload.len());
        self.items.push_back(message);
    }

    fn drain_all(&mut self) -> Vec<Message> {
        self.items.drain(..).collect()
    }

    fn requeue_front(&mut self, messages: Vec<Message>) {
        for message in messages.into_iter().rev() {
            self.items.push_front(message);
        }
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = InMemoryQueue::new();
        queue.enqueue(Message::new("a", false));
        queue.enqueue(Message::new("b", true));
        queue.enqueue(Message::new("c", false));

        let drained = queue.drain_all();
        let payloads: Vec<_> = drained.iter().map(|m| m.payload.as_str()).collect();
        assert_eq!(payloads, vec!["a", "b", "c"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_empty() {
        let mut queue = InMemoryQueue::new();
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn test_requeue_front_keeps_order() {
        let mut queue = InMemoryQueue::new();
        queue.enqueue(Message::new("d", false));

        // A failed flush puts its unsent suffix back ahead of later sends.
        queue.requeue_front(vec![Message::new("b", false), Message::new("c", false)]);

        let payloads: Vec<_> = queue
            .drain_all()
            .into_iter()
            .map(|m| m.payload)
            .collect();
        assert_eq!(payloads, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_message_serde_roundtrip() {
        // Persisting queue implementations round-trip messages through serde.
        let msg = Message::new(r#"{"k":"v"}"#, true);
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_len() {
        let mut queue = InMemoryQueue::new();
        assert_eq!(queue.len(), 0);
        queue.enqueue(Message::new("x", false));
        queue.enqueue(Message::new("y", false));
        assert_eq!(queue.len(), 2);
    }
}
