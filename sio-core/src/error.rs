//! Global error types for the Socket.IO client.
//!
//! All error categories across the workspace are unified into a single
//! `SioError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using SioError.
pub type SioResult<T> = Result<T, SioError>;

/// Unified error type covering all error categories in the client.
#[derive(Error, Debug)]
pub enum SioError {
    // -- Connection lifecycle errors --
    /// The connect-timeout watchdog fired before the handshake completed.
    #[error("connect attempt timed out")]
    ConnectTimeout,

    /// The heartbeat-timeout watchdog fired while connected.
    #[error("heartbeat timed out")]
    HeartbeatTimeout,

    /// The transport adapter reported an error.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The transport connection was closed by the remote end.
    #[error("transport closed")]
    TransportClosed,

    /// The client task has shut down and can no longer accept commands.
    #[error("client closed")]
    Closed,

    // -- Configuration errors --
    /// Failed to load or parse configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for SioError {
    fn from(e: serde_json::Error) -> Self {
        SioError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for SioError {
    fn from(e: toml::de::Error) -> Self {
        SioError::Config(e.to_string())
    }
}
