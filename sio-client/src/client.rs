//! Socket.IO connection state machine.
//!
//! [`SocketIoClient`] is a cheap handle whose methods post commands to a
//! single spawned actor task. The actor owns the transport, the offline
//! queue, the watchdog timers, and the session, and is the sole writer of
//! connection state, so every transition -- command, transport event, or
//! watchdog expiry -- is serialized and race-free by construction.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use sio_core::config::ClientConfig;
use sio_core::constants;
use sio_core::error::{SioError, SioResult};

use crate::endpoint::Endpoint;
use crate::events::{
    spawn_delegate, ClientDelegate, ClientEvent, ConnectionState, DisconnectReason,
    EventDispatcher, FailureKind,
};
use crate::monitor::Watchdog;
use crate::packet::{self, Frame};
use crate::queue::{InMemoryQueue, Message, MessageQueue};
use crate::transport::{Handshake, Transport, TransportEvent};

/// Commands posted from the handle to the actor task.
enum Command {
    Connect,
    Disconnect,
    Send(Message),
    QueueOffline(Message),
    /// Internal: a retry scheduled by a watchdog. Carries the retry epoch at
    /// scheduling time; a `disconnect()` issued in between bumps the epoch
    /// and voids the retry.
    Retry(u64),
    Shutdown,
}

/// Handle to a running Socket.IO client.
///
/// All methods are non-blocking: they mutate in-memory state or post a
/// command to the client's actor task and return immediately. Dropping the
/// handle aborts the task; prefer [`shutdown`](SocketIoClient::shutdown) for
/// a graceful exit.
pub struct SocketIoClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    session_rx: watch::Receiver<Option<String>>,
    dispatcher: EventDispatcher,
    task: Option<JoinHandle<()>>,
}

impl SocketIoClient {
    /// Spawn a client over the given transport with the default in-memory
    /// offline queue.
    pub fn start<T: Transport>(endpoint: Endpoint, config: ClientConfig, transport: T) -> Self {
        Self::start_with_queue(endpoint, config, transport, Box::new(InMemoryQueue::new()))
    }

    /// Spawn a client with a caller-provided offline queue, for collaborators
    /// that persist queued messages instead of keeping them in memory.
    pub fn start_with_queue<T: Transport>(
        endpoint: Endpoint,
        config: ClientConfig,
        transport: T,
        queue: Box<dyn MessageQueue>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (session_tx, session_rx) = watch::channel(None);
        let dispatcher = EventDispatcher::new(constants::DEFAULT_EVENT_CAPACITY);

        let worker = Worker {
            endpoint,
            heartbeat_timeout: config.heartbeat_timeout(),
            config,
            transport,
            queue,
            state: ConnectionState::Disconnected,
            session_id: None,
            connect_watchdog: Watchdog::new("connect"),
            heartbeat_watchdog: Watchdog::new("heartbeat"),
            transport_open: false,
            transport_exhausted: false,
            retry_epoch: 0,
            state_tx,
            session_tx,
            dispatcher: dispatcher.clone(),
            cmd_tx: cmd_tx.clone(),
            cmd_rx,
        };
        let task = tokio::spawn(worker.run());

        Self {
            cmd_tx,
            state_rx,
            session_rx,
            dispatcher,
            task: Some(task),
        }
    }

    /// Begin connecting. No-op if already connecting or connected.
    pub fn connect(&self) -> SioResult<()> {
        self.command(Command::Connect)
    }

    /// Disconnect and cancel any pending retry. Never auto-retried.
    pub fn disconnect(&self) -> SioResult<()> {
        self.command(Command::Disconnect)
    }

    /// Send a message, or queue it if not connected.
    ///
    /// Rather than coupling this client to any specific JSON library, the
    /// payload is always a string (either _the_ string, or the JSON-encoded
    /// version of the caller's object) with `is_json` indicating which.
    /// Queued delivery is best-effort and ordering-preserving; this never
    /// fails for the message itself, only if the client has shut down.
    pub fn send(&self, payload: impl Into<String>, is_json: bool) -> SioResult<()> {
        self.command(Command::Send(Message::new(payload, is_json)))
    }

    /// Append a message to the offline queue regardless of connection state.
    ///
    /// Lets collaborators pre-seed or replay persisted offline messages; they
    /// go out with the next flush, ahead of nothing they shouldn't.
    pub fn queue_offline_message(&self, message: Message) -> SioResult<()> {
        self.command(Command::QueueOffline(message))
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Whether a session is currently established.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Whether a connect attempt is in flight.
    pub fn is_connecting(&self) -> bool {
        self.state() == ConnectionState::Connecting
    }

    /// The server-assigned session id; `Some` only while connected.
    pub fn session_id(&self) -> Option<String> {
        self.session_rx.borrow().clone()
    }

    /// Subscribe to connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// The event dispatcher (for subscribing to events).
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.dispatcher
    }

    /// Subscribe to client events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.dispatcher.subscribe()
    }

    /// Attach a delegate; its callbacks run serially on a dedicated task.
    pub fn attach_delegate(&self, delegate: Arc<dyn ClientDelegate>) -> JoinHandle<()> {
        spawn_delegate(&self.dispatcher, delegate)
    }

    /// Gracefully stop the client: close the transport, end the actor task,
    /// and wait for it.
    pub async fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn command(&self, cmd: Command) -> SioResult<()> {
        self.cmd_tx.send(cmd).map_err(|_| SioError::Closed)
    }
}

impl Drop for SocketIoClient {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for SocketIoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketIoClient")
            .field("state", &self.state())
            .field("session_id", &self.session_id())
            .finish()
    }
}

/// The actor task: owns every piece of mutable client state.
struct Worker<T: Transport> {
    endpoint: Endpoint,
    config: ClientConfig,
    transport: T,
    queue: Box<dyn MessageQueue>,
    state: ConnectionState,
    session_id: Option<String>,
    /// Effective heartbeat timeout: the server handshake value when it
    /// advertises one, otherwise the configured value.
    heartbeat_timeout: Duration,
    connect_watchdog: Watchdog,
    heartbeat_watchdog: Watchdog,
    transport_open: bool,
    /// Set when the transport event stream ends; stops polling `recv`.
    transport_exhausted: bool,
    /// Bumped on every explicit disconnect to void scheduled retries.
    retry_epoch: u64,
    state_tx: watch::Sender<ConnectionState>,
    session_tx: watch::Sender<Option<String>>,
    dispatcher: EventDispatcher,
    cmd_tx: mpsc::UnboundedSender<Command>,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
}

impl<T: Transport> Worker<T> {
    async fn run(mut self) {
        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Shutdown) | None => {
                            self.close_transport().await;
                            debug!("client task exiting");
                            return;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
                event = self.transport.recv(), if !self.transport_exhausted => {
                    self.handle_transport_event(event).await;
                }
                generation = self.connect_watchdog.expired() => {
                    self.on_connect_timeout(generation).await;
                }
                generation = self.heartbeat_watchdog.expired() => {
                    self.on_heartbeat_timeout(generation).await;
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Connect => self.do_connect().await,
            Command::Retry(epoch) => {
                if epoch == self.retry_epoch {
                    self.do_connect().await;
                } else {
                    debug!("retry voided by an explicit disconnect");
                }
            }
            Command::Disconnect => self.do_disconnect().await,
            Command::Send(message) => {
                if self.state == ConnectionState::Connected {
                    self.send_now(message).await;
                } else {
                    debug!("not connected, queueing message");
                    self.queue.enqueue(message);
                }
            }
            Command::QueueOffline(message) => self.queue.enqueue(message),
            Command::Shutdown => unreachable!("handled in run"),
        }
    }

    async fn do_connect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            debug!("already {}, ignoring connect", self.state);
            return;
        }

        let url = self.endpoint.url();
        info!("connecting to {url}");
        self.set_state(ConnectionState::Connecting);

        match self.transport.open(&url).await {
            Ok(()) => {
                self.transport_open = true;
                self.connect_watchdog.arm(self.config.connect_timeout());
            }
            Err(e) => {
                warn!("transport open failed: {e}");
                self.fail(
                    FailureKind::Transport(e.to_string()),
                    DisconnectReason::TransportFailure,
                )
                .await;
            }
        }
    }

    async fn do_disconnect(&mut self) {
        // Whatever happens next, a retry scheduled before this point must
        // not fire.
        self.retry_epoch += 1;

        if self.state == ConnectionState::Disconnected {
            debug!("already disconnected");
            return;
        }

        info!("disconnecting");
        self.connect_watchdog.disarm();
        self.heartbeat_watchdog.disarm();
        self.close_transport().await;
        self.enter_disconnected();
        self.dispatcher.dispatch(ClientEvent::Disconnected {
            reason: DisconnectReason::Requested,
        });
    }

    /// Hand one message to the transport and report it. On failure the
    /// message goes back into the queue and the transport failure path runs.
    async fn send_now(&mut self, message: Message) {
        let frame = packet::encode_message(&message.payload, message.is_json);
        match self.transport.send(frame).await {
            Ok(()) => {
                self.dispatcher.dispatch(ClientEvent::MessageSent {
                    payload: message.payload,
                    is_json: message.is_json,
                });
            }
            Err(e) => {
                warn!("transport send failed: {e}");
                self.queue.enqueue(message);
                self.fail(
                    FailureKind::Transport(e.to_string()),
                    DisconnectReason::TransportFailure,
                )
                .await;
            }
        }
    }

    async fn handle_transport_event(&mut self, event: Option<TransportEvent>) {
        match event {
            Some(TransportEvent::Opened(handshake)) => self.on_transport_opened(handshake).await,
            Some(TransportEvent::Message(raw)) => self.on_transport_message(raw).await,
            Some(TransportEvent::Closed) => self.on_transport_closed().await,
            Some(TransportEvent::Failed(e)) => {
                if self.state == ConnectionState::Disconnected {
                    debug!("transport failure while disconnected ignored: {e}");
                } else {
                    warn!("transport failure: {e}");
                    self.fail(
                        FailureKind::Transport(e),
                        DisconnectReason::TransportFailure,
                    )
                    .await;
                }
            }
            None => {
                debug!("transport event stream exhausted");
                self.transport_exhausted = true;
                self.on_transport_closed().await;
            }
        }
    }

    async fn on_transport_opened(&mut self, handshake: Handshake) {
        if self.state != ConnectionState::Connecting {
            debug!("ignoring opened event while {}", self.state);
            return;
        }

        self.connect_watchdog.disarm();
        self.heartbeat_timeout = handshake
            .heartbeat_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.config.heartbeat_timeout());
        // State goes out before the session id, so an observer polling both
        // can never see a session id on a not-yet-connected client.
        self.set_state(ConnectionState::Connected);
        self.session_id = Some(handshake.session_id.clone());
        let _ = self.session_tx.send(self.session_id.clone());
        self.heartbeat_watchdog.arm(self.heartbeat_timeout);
        info!("connected, session {}", handshake.session_id);

        if let Err(e) = self.flush_offline_queue().await {
            warn!("offline queue flush failed: {e}");
            self.fail(
                FailureKind::Transport(e.to_string()),
                DisconnectReason::TransportFailure,
            )
            .await;
            return;
        }

        self.dispatcher.dispatch(ClientEvent::Connected {
            session_id: handshake.session_id,
        });
    }

    /// Drain the offline queue into the transport in enqueue order.
    ///
    /// On a send failure the unsent suffix (failed message first) is put
    /// back at the front of the queue, so nothing is lost or reordered.
    async fn flush_offline_queue(&mut self) -> SioResult<()> {
        let pending = self.queue.drain_all();
        if pending.is_empty() {
            return Ok(());
        }

        info!("flushing {} offline message(s)", pending.len());
        let mut iter = pending.into_iter();
        while let Some(message) = iter.next() {
            let frame = packet::encode_message(&message.payload, message.is_json);
            if let Err(e) = self.transport.send(frame).await {
                let mut unsent = vec![message];
                unsent.extend(iter);
                self.queue.requeue_front(unsent);
                return Err(e);
            }
            self.dispatcher.dispatch(ClientEvent::MessageSent {
                payload: message.payload,
                is_json: message.is_json,
            });
        }
        Ok(())
    }

    async fn on_transport_message(&mut self, raw: String) {
        if self.state != ConnectionState::Connected {
            debug!("ignoring frame while {}", self.state);
            return;
        }

        match packet::decode(&raw) {
            Frame::Heartbeat => {
                debug!("heartbeat received");
                self.heartbeat_watchdog.arm(self.heartbeat_timeout);
                if let Err(e) = self.transport.send(packet::encode_heartbeat()).await {
                    warn!("heartbeat echo failed: {e}");
                    self.fail(
                        FailureKind::Transport(e.to_string()),
                        DisconnectReason::TransportFailure,
                    )
                    .await;
                }
            }
            Frame::Message { payload, is_json } => {
                self.dispatcher
                    .dispatch(ClientEvent::Message { payload, is_json });
            }
            Frame::Connect => debug!("connect ack"),
            Frame::Disconnect => {
                info!("server requested disconnect");
                self.on_transport_closed().await;
            }
            Frame::Error(reason) => {
                warn!("server error frame: {reason}");
                self.fail(
                    FailureKind::Transport(reason),
                    DisconnectReason::TransportFailure,
                )
                .await;
            }
            Frame::Unknown(frame) => debug!("unknown frame ignored: {frame}"),
        }
    }

    async fn on_transport_closed(&mut self) {
        if self.state == ConnectionState::Disconnected {
            debug!("transport close while disconnected ignored");
            return;
        }

        warn!("transport closed");
        self.connect_watchdog.disarm();
        self.heartbeat_watchdog.disarm();
        self.close_transport().await;
        self.enter_disconnected();
        self.dispatcher.dispatch(ClientEvent::Disconnected {
            reason: DisconnectReason::TransportClosed,
        });
    }

    async fn on_connect_timeout(&mut self, generation: u64) {
        if self.state != ConnectionState::Connecting {
            debug!("stale connect timeout (gen {generation}) while {}", self.state);
            return;
        }

        warn!(
            "connect attempt timed out after {:?}",
            self.config.connect_timeout()
        );
        self.close_transport().await;
        self.enter_disconnected();

        if self.config.retry_on_connect_timeout {
            info!("retrying connect");
            let _ = self.cmd_tx.send(Command::Retry(self.retry_epoch));
        } else {
            self.dispatcher.dispatch(ClientEvent::Failure {
                kind: FailureKind::ConnectTimeout,
            });
            self.dispatcher.dispatch(ClientEvent::Disconnected {
                reason: DisconnectReason::ConnectTimeout,
            });
        }
    }

    async fn on_heartbeat_timeout(&mut self, generation: u64) {
        if self.state != ConnectionState::Connected {
            debug!("stale heartbeat timeout (gen {generation}) while {}", self.state);
            return;
        }

        warn!("no heartbeat within {:?}", self.heartbeat_timeout);
        self.connect_watchdog.disarm();
        self.close_transport().await;
        self.enter_disconnected();

        if self.config.retry_on_heartbeat_timeout {
            self.dispatcher.dispatch(ClientEvent::Disconnected {
                reason: DisconnectReason::HeartbeatTimeout,
            });
            info!("retrying connect after heartbeat timeout");
            let _ = self.cmd_tx.send(Command::Retry(self.retry_epoch));
        } else {
            // Same order as every other failure path: the failure first,
            // then the disconnect notification.
            self.dispatcher.dispatch(ClientEvent::Failure {
                kind: FailureKind::HeartbeatTimeout,
            });
            self.dispatcher.dispatch(ClientEvent::Disconnected {
                reason: DisconnectReason::HeartbeatTimeout,
            });
        }
    }

    /// Terminal path for transport-level errors: both watchdogs off,
    /// transport closed, failure surfaced, then the disconnect notification.
    async fn fail(&mut self, kind: FailureKind, reason: DisconnectReason) {
        self.connect_watchdog.disarm();
        self.heartbeat_watchdog.disarm();
        self.close_transport().await;
        let was = self.state;
        self.enter_disconnected();
        self.dispatcher.dispatch(ClientEvent::Failure { kind });
        if was != ConnectionState::Disconnected {
            self.dispatcher
                .dispatch(ClientEvent::Disconnected { reason });
        }
    }

    async fn close_transport(&mut self) {
        if self.transport_open {
            if let Err(e) = self.transport.close().await {
                debug!("transport close error: {e}");
            }
            self.transport_open = false;
        }
    }

    /// Enter `Disconnected` and reset session fields, keeping the invariant
    /// that a session id exists only while connected.
    fn enter_disconnected(&mut self) {
        self.session_id = None;
        let _ = self.session_tx.send(None);
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&mut self, new_state: ConnectionState) {
        if self.state != new_state {
            info!("client state: {} -> {}", self.state, new_state);
            self.state = new_state;
            let _ = self.state_tx.send(new_state);
        }
    }
}
