//! Transport selection: which HTTP/2 client carries a call, given an address.
//!
//! - `host:443` uses TLS with ALPN `h2`.
//! - any other `host:port` uses HTTP/2 with prior knowledge over cleartext TCP.
//! - `unix:@name` / `unix:/path` uses the same h2c client dialing a local
//!   socket, with requests addressed to a loopback origin.
//!
//! HTTP/1.1 is never negotiated: every client is built `http2_only`.

mod target;
mod tls;
mod unix;

pub use target::{LOOPBACK_ORIGIN, SECURE_PORT_SUFFIX, Target, UNIX_PREFIX};
pub use unix::{UnixConnector, UnixIo, UnixSocketAddr};

use std::fmt;

use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::{Client as LegacyClient, ResponseFuture};
use hyper_util::rt::TokioExecutor;

use crate::{ClientOptions, Result};

/// Body type of every outbound request.
pub type RequestBody = crate::body::BoxedBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum TransportKind {
    Tls,
    H2c,
    UnixH2c,
}

#[derive(Clone)]
pub(crate) enum Transport {
    Tls(LegacyClient<HttpsConnector<HttpConnector>, RequestBody>),
    H2c(LegacyClient<HttpConnector, RequestBody>),
    Unix(LegacyClient<UnixConnector, RequestBody>),
}

impl Transport {
    pub(crate) fn for_target(target: &Target, options: &ClientOptions) -> Result<Self> {
        let transport = match target {
            Target::Tls { .. } => Self::Tls(
                h2_client().build(tls::https_connector(options.insecure, options.connect_timeout)?),
            ),
            Target::Tcp { .. } => {
                Self::H2c(h2_client().build(tls::tcp_connector(options.connect_timeout)))
            }
            Target::Unix(addr) => Self::Unix(
                h2_client().build(UnixConnector::new(addr.clone(), options.connect_timeout)),
            ),
        };
        Ok(transport)
    }

    pub(crate) fn kind(&self) -> TransportKind {
        match self {
            Self::Tls(_) => TransportKind::Tls,
            Self::H2c(_) => TransportKind::H2c,
            Self::Unix(_) => TransportKind::UnixH2c,
        }
    }

    pub(crate) fn request(&self, req: http::Request<RequestBody>) -> ResponseFuture {
        match self {
            Self::Tls(client) => client.request(req),
            Self::H2c(client) => client.request(req),
            Self::Unix(client) => client.request(req),
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transport").field(&self.kind()).finish()
    }
}

fn h2_client() -> hyper_util::client::legacy::Builder {
    let mut builder = LegacyClient::builder(TokioExecutor::new());
    builder.http2_only(true);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport_for(address: &str) -> Result<Transport> {
        let options = ClientOptions::new(address);
        Transport::for_target(&Target::parse(address)?, &options)
    }

    #[tokio::test]
    async fn address_selects_transport_kind() -> Result<()> {
        assert_eq!(transport_for("example.com:443")?.kind(), TransportKind::Tls);
        assert_eq!(transport_for("127.0.0.1:50051")?.kind(), TransportKind::H2c);
        assert_eq!(transport_for("unix:@echo")?.kind(), TransportKind::UnixH2c);
        Ok(())
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(TransportKind::Tls.to_string(), "tls");
        assert_eq!(TransportKind::H2c.to_string(), "h2c");
        assert_eq!(TransportKind::UnixH2c.to_string(), "unix_h2c");
    }
}
