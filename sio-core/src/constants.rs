//! Workspace-wide constants.

/// Library name.
pub const LIB_NAME: &str = "socketio-client";

/// Library version.
pub const LIB_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Socket.IO protocol revision spoken by this client.
pub const PROTOCOL_REVISION: u8 = 1;

/// Default connect timeout in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 15_000;

/// Default heartbeat timeout in milliseconds.
///
/// Must exceed the server's heartbeat send interval to tolerate jitter;
/// servers of this era default to a 12-15s send interval.
pub const DEFAULT_HEARTBEAT_TIMEOUT_MS: u64 = 15_000;

/// Default port for insecure (ws://) endpoints.
pub const DEFAULT_PORT: u16 = 80;

/// Default port for secure (wss://) endpoints.
pub const DEFAULT_SECURE_PORT: u16 = 443;

/// Default capacity for the client event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 32;
