use std::time::Duration;

use crate::Metadata;

/// Bound on dialing a local socket (and on TCP connects) so a missing
/// listener fails fast.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A message sent to a unary or server-streaming method, or handed to a
/// unary/server-streaming handler.
///
/// `metadata` holds extra request headers on the client side and the
/// received request headers on the server side.
#[derive(Debug, Clone, Default)]
pub struct Request<T> {
    pub message: T,
    pub metadata: Metadata,
}

impl<T> Request<T> {
    pub fn new(message: T) -> Self {
        Self {
            message,
            metadata: Metadata::new(),
        }
    }

    pub fn into_message(self) -> T {
        self.message
    }
}

/// A single response message and the trailer that reported its outcome.
///
/// Handlers may fill `trailer` with extra entries; the status keys are
/// always owned by the server.
#[derive(Debug, Clone, Default)]
pub struct Response<T> {
    pub message: T,
    pub trailer: Metadata,
}

impl<T> Response<T> {
    pub fn new(message: T) -> Self {
        Self {
            message,
            trailer: Metadata::new(),
        }
    }

    pub fn into_message(self) -> T {
        self.message
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// `HOST:PORT` (port 443 selects TLS) or `unix:@NAME` / `unix:/PATH`.
    pub address: String,
    /// Skip TLS certificate verification. Test and development use only.
    pub insecure: bool,
    /// Extra default headers as `"Key: Value"` lines; malformed lines are ignored.
    pub headers: Vec<String>,
    pub connect_timeout: Duration,
}

impl ClientOptions {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            address: String::new(),
            insecure: false,
            headers: Vec::new(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}
