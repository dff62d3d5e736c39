//! Server endpoint description and transport URL derivation.

use sio_core::constants;

/// An immutable description of the server the client connects to.
///
/// Computed once at construction; the transport URL is derived from it and
/// never changes for the lifetime of a client instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    resource: String,
    port: u16,
    secure: bool,
}

impl Endpoint {
    /// Create an endpoint.
    ///
    /// Leading and trailing slashes on the resource path are trimmed, so
    /// `"/socket.io"` and `"socket.io"` are equivalent.
    pub fn new(
        host: impl Into<String>,
        resource: impl Into<String>,
        port: u16,
        secure: bool,
    ) -> Self {
        let resource = resource.into();
        Self {
            host: host.into(),
            resource: resource.trim_matches('/').to_string(),
            port,
            secure,
        }
    }

    /// An insecure (`ws://`) endpoint on the default port.
    pub fn insecure(host: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::new(host, resource, constants::DEFAULT_PORT, false)
    }

    /// A secure (`wss://`) endpoint on the default port.
    pub fn secure(host: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::new(host, resource, constants::DEFAULT_SECURE_PORT, true)
    }

    /// The server host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The normalized resource path (no surrounding slashes).
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The server port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the connection uses TLS.
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// The transport URL, `ws://` or `wss://` per the secure flag.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        if self.resource.is_empty() {
            format!("{scheme}://{}:{}", self.host, self.port)
        } else {
            format!("{scheme}://{}:{}/{}", self.host, self.port, self.resource)
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url())
    }
}
