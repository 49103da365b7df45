use std::fmt;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::{TcpListener, TcpStream, UnixListener, UnixStream};

use crate::Result;
use crate::transport::UnixSocketAddr;

/// Where a server accepts connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    Tcp(SocketAddr),
    Unix(UnixSocketAddr),
}

impl ListenAddr {
    /// A non-zero `port` listens on all interfaces; otherwise `socket` names
    /// the local socket (`@name` or a path).
    pub fn from_flags(port: u16, socket: &str) -> Result<Self> {
        if port != 0 {
            return Ok(Self::Tcp(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))));
        }
        Ok(Self::Unix(UnixSocketAddr::parse(socket)?))
    }

    /// The address a client passes to reach this listener.
    #[must_use]
    pub fn client_address(&self) -> String {
        match self {
            Self::Tcp(addr) if addr.ip().is_unspecified() => format!("127.0.0.1:{}", addr.port()),
            Self::Tcp(addr) => addr.to_string(),
            Self::Unix(addr) => format!("unix:{addr}"),
        }
    }
}

impl fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "{addr}"),
            Self::Unix(addr) => write!(f, "unix:{addr}"),
        }
    }
}

#[derive(Debug)]
enum Inner {
    Tcp(TcpListener),
    Unix(UnixListener, UnixSocketAddr),
}

/// A bound TCP or local-socket listener; the server treats both alike.
#[derive(Debug)]
pub struct Listener {
    inner: Inner,
}

pub(crate) enum Accepted {
    Tcp(TcpStream, SocketAddr),
    Unix(UnixStream),
}

impl Listener {
    pub async fn bind(addr: &ListenAddr) -> Result<Self> {
        let inner = match addr {
            ListenAddr::Tcp(addr) => Inner::Tcp(TcpListener::bind(addr).await?),
            ListenAddr::Unix(addr) => Inner::Unix(addr.bind()?, addr.clone()),
        };
        Ok(Self { inner })
    }

    /// The bound address; for TCP this carries the port actually assigned.
    pub fn local_addr(&self) -> Result<ListenAddr> {
        match &self.inner {
            Inner::Tcp(listener) => Ok(ListenAddr::Tcp(listener.local_addr()?)),
            Inner::Unix(_, addr) => Ok(ListenAddr::Unix(addr.clone())),
        }
    }

    pub(crate) async fn accept(&self) -> io::Result<Accepted> {
        match &self.inner {
            Inner::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                stream.set_nodelay(true)?;
                Ok(Accepted::Tcp(stream, peer))
            }
            Inner::Unix(listener, _) => {
                let (stream, _) = listener.accept().await?;
                Ok(Accepted::Unix(stream))
            }
        }
    }
}
