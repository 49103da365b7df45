use std::fmt;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use http::Uri;
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_util::client::legacy::connect::{Connected, Connection};
use hyper_util::rt::TokioIo;
use tokio::net::{UnixListener, UnixStream};

use crate::{Error, Result};

/// A local stream socket: `@name` lives in the Linux abstract namespace,
/// anything else is a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnixSocketAddr {
    Abstract(String),
    Path(PathBuf),
}

impl UnixSocketAddr {
    pub fn parse(socket: &str) -> Result<Self> {
        let socket = socket.trim();
        match socket.strip_prefix('@') {
            Some("") => Err(Error::InvalidAddress(format!("unix:{socket}"))),
            Some(name) => Ok(Self::Abstract(name.to_string())),
            None if socket.is_empty() => Err(Error::InvalidAddress(format!("unix:{socket}"))),
            None => Ok(Self::Path(PathBuf::from(socket))),
        }
    }

    pub async fn connect(&self, timeout: Duration) -> io::Result<UnixStream> {
        let dial = async {
            match self {
                Self::Path(path) => UnixStream::connect(path).await,
                Self::Abstract(name) => connect_abstract(name.clone()).await,
            }
        };
        tokio::time::timeout(timeout, dial).await.map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to unix:{self} timed out after {timeout:?}"),
            )
        })?
    }

    /// Must be called from within a tokio runtime.
    pub fn bind(&self) -> io::Result<UnixListener> {
        match self {
            Self::Path(path) => UnixListener::bind(path),
            Self::Abstract(name) => bind_abstract(name),
        }
    }
}

impl fmt::Display for UnixSocketAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abstract(name) => write!(f, "@{name}"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

#[cfg(target_os = "linux")]
async fn connect_abstract(name: String) -> io::Result<UnixStream> {
    use std::os::linux::net::SocketAddrExt as _;
    use std::os::unix::net::{SocketAddr, UnixStream as StdUnixStream};

    let stream = tokio::task::spawn_blocking(move || {
        let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
        let stream = StdUnixStream::connect_addr(&addr)?;
        stream.set_nonblocking(true)?;
        Ok::<_, io::Error>(stream)
    })
    .await
    .map_err(io::Error::other)??;

    UnixStream::from_std(stream)
}

#[cfg(not(target_os = "linux"))]
async fn connect_abstract(_name: String) -> io::Result<UnixStream> {
    Err(abstract_unsupported())
}

#[cfg(target_os = "linux")]
fn bind_abstract(name: &str) -> io::Result<UnixListener> {
    use std::os::linux::net::SocketAddrExt as _;
    use std::os::unix::net::{SocketAddr, UnixListener as StdUnixListener};

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    let listener = StdUnixListener::bind_addr(&addr)?;
    listener.set_nonblocking(true)?;
    UnixListener::from_std(listener)
}

#[cfg(not(target_os = "linux"))]
fn bind_abstract(_name: &str) -> io::Result<UnixListener> {
    Err(abstract_unsupported())
}

#[cfg(not(target_os = "linux"))]
fn abstract_unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "abstract unix sockets are only available on Linux",
    )
}

/// Dials the same local socket for every request, whatever the URI says.
#[derive(Debug, Clone)]
pub struct UnixConnector {
    addr: Arc<UnixSocketAddr>,
    timeout: Duration,
}

impl UnixConnector {
    pub fn new(addr: UnixSocketAddr, timeout: Duration) -> Self {
        Self {
            addr: Arc::new(addr),
            timeout,
        }
    }

    #[must_use]
    pub fn addr(&self) -> &UnixSocketAddr {
        &self.addr
    }
}

impl tower_service::Service<Uri> for UnixConnector {
    type Response = UnixIo;
    type Error = io::Error;
    type Future = Pin<Box<dyn Future<Output = io::Result<UnixIo>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _uri: Uri) -> Self::Future {
        let addr = Arc::clone(&self.addr);
        let timeout = self.timeout;
        Box::pin(async move {
            let stream = addr.connect(timeout).await?;
            Ok(UnixIo(TokioIo::new(stream)))
        })
    }
}

/// A connected local socket as seen by the HTTP/2 client.
#[derive(Debug)]
pub struct UnixIo(TokioIo<UnixStream>);

impl Read for UnixIo {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_read(cx, buf)
    }
}

impl Write for UnixIo {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().0).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().0).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.0.is_write_vectored()
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().0).poll_write_vectored(cx, bufs)
    }
}

impl Connection for UnixIo {
    fn connected(&self) -> Connected {
        Connected::new()
    }
}
