//! Shared test utilities for integration tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, watch};

use sio_client::{ClientEvent, ConnectionState, Handshake, Transport, TransportEvent};
use sio_core::config::ClientConfig;
use sio_core::error::{SioError, SioResult};

/// State shared between a [`MockTransport`] and its [`MockHandle`].
#[derive(Default)]
pub struct MockShared {
    sent: Mutex<Vec<String>>,
    open_urls: Mutex<Vec<String>>,
    open_count: AtomicUsize,
    close_count: AtomicUsize,
    fail_sends: AtomicBool,
}

/// A scripted transport: the test drives events in through the handle and
/// inspects what the client wrote out.
pub struct MockTransport {
    events: mpsc::UnboundedReceiver<TransportEvent>,
    shared: Arc<MockShared>,
}

/// Test-side handle for a [`MockTransport`].
pub struct MockHandle {
    events: mpsc::UnboundedSender<TransportEvent>,
    shared: Arc<MockShared>,
}

/// Create a scripted transport and its controlling handle.
pub fn mock_transport() -> (MockTransport, MockHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(MockShared::default());
    (
        MockTransport {
            events: rx,
            shared: shared.clone(),
        },
        MockHandle { events: tx, shared },
    )
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&mut self, url: &str) -> SioResult<()> {
        self.shared.open_urls.lock().unwrap().push(url.to_string());
        self.shared.open_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&mut self, frame: String) -> SioResult<()> {
        if self.shared.fail_sends.load(Ordering::SeqCst) {
            return Err(SioError::Transport("mock send failure".into()));
        }
        self.shared.sent.lock().unwrap().push(frame);
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) -> SioResult<()> {
        self.shared.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MockHandle {
    /// Simulate the transport completing its handshake.
    pub fn opened(&self, session_id: &str) {
        self.events
            .send(TransportEvent::Opened(Handshake::new(session_id)))
            .unwrap();
    }

    /// Simulate a handshake that advertises a server heartbeat timeout.
    pub fn opened_with_heartbeat(&self, session_id: &str, heartbeat_timeout_ms: u64) {
        self.events
            .send(TransportEvent::Opened(Handshake {
                session_id: session_id.to_string(),
                heartbeat_timeout_ms: Some(heartbeat_timeout_ms),
            }))
            .unwrap();
    }

    /// Deliver a raw inbound frame.
    pub fn frame(&self, raw: &str) {
        self.events
            .send(TransportEvent::Message(raw.to_string()))
            .unwrap();
    }

    /// Deliver a server heartbeat.
    pub fn heartbeat(&self) {
        self.frame("2::");
    }

    /// Simulate a remote close.
    pub fn closed(&self) {
        self.events.send(TransportEvent::Closed).unwrap();
    }

    /// Simulate a transport error.
    pub fn failed(&self, error: &str) {
        self.events
            .send(TransportEvent::Failed(error.to_string()))
            .unwrap();
    }

    /// Frames the client has successfully written, in order.
    pub fn sent(&self) -> Vec<String> {
        self.shared.sent.lock().unwrap().clone()
    }

    /// URLs the client has opened, in order.
    pub fn open_urls(&self) -> Vec<String> {
        self.shared.open_urls.lock().unwrap().clone()
    }

    /// Number of `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.shared.open_count.load(Ordering::SeqCst)
    }

    /// Number of `close` calls so far.
    pub fn close_count(&self) -> usize {
        self.shared.close_count.load(Ordering::SeqCst)
    }

    /// Make every subsequent `send` fail until turned off again.
    pub fn set_fail_sends(&self, fail: bool) {
        self.shared.fail_sends.store(fail, Ordering::SeqCst);
    }
}

/// A config with test-friendly timeouts and no retries.
///
/// Also installs the console test logger, so every suite gets tracing
/// output for free.
pub fn test_config() -> ClientConfig {
    sio_core::logging::init_test_logging();
    let mut config = ClientConfig::default();
    config.connect_timeout_ms = 15_000;
    config.heartbeat_timeout_ms = 15_000;
    config
}

/// Block until the state watch reports `target`.
pub async fn wait_for_state(
    rx: &mut watch::Receiver<ConnectionState>,
    target: ConnectionState,
) {
    let deadline = Duration::from_secs(60);
    tokio::time::timeout(deadline, async {
        loop {
            if *rx.borrow() == target {
                return;
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for state {target}"));
}

/// Receive the next client event, panicking if none arrives.
pub async fn next_event(rx: &mut broadcast::Receiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(60), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

/// Assert that no event arrives within the given window.
pub async fn assert_no_event(rx: &mut broadcast::Receiver<ClientEvent>, window: Duration) {
    if let Ok(event) = tokio::time::timeout(window, rx.recv()).await {
        panic!("unexpected event: {:?}", event.unwrap());
    }
}
