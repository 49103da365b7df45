use http::uri::Authority;

use super::{TransportKind, UnixSocketAddr};
use crate::{Error, Result};

pub const UNIX_PREFIX: &str = "unix:";

/// Port whose use implies TLS.
pub const SECURE_PORT_SUFFIX: &str = ":443";

/// Origin used for requests dialed over a local socket; the connector ignores it.
pub const LOOPBACK_ORIGIN: &str = "http://localhost";

/// Where a client sends its calls, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Tls { authority: String },
    Tcp { authority: String },
    Unix(UnixSocketAddr),
}

impl Target {
    pub fn parse(address: &str) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            return Err(Error::InvalidAddress(address.to_string()));
        }

        if let Some(socket) = address.strip_prefix(UNIX_PREFIX) {
            return Ok(Self::Unix(UnixSocketAddr::parse(socket)?));
        }

        let authority: Authority = address
            .parse()
            .map_err(|_| Error::InvalidAddress(address.to_string()))?;
        if authority.as_str() != address {
            return Err(Error::InvalidAddress(address.to_string()));
        }

        let authority = authority.as_str().to_string();
        if address.ends_with(SECURE_PORT_SUFFIX) {
            Ok(Self::Tls { authority })
        } else {
            Ok(Self::Tcp { authority })
        }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        match self {
            Self::Tls { authority } => format!("https://{authority}"),
            Self::Tcp { authority } => format!("http://{authority}"),
            Self::Unix(_) => LOOPBACK_ORIGIN.to_string(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Tls { .. } => TransportKind::Tls,
            Self::Tcp { .. } => TransportKind::H2c,
            Self::Unix(_) => TransportKind::UnixH2c,
        }
    }
}
