use std::net::SocketAddr;

use sidecar::{Client, ClientOptions, ListenAddr, Listener, Server, UnixSocketAddr};
use tokio::sync::oneshot;

/// The echo service running in-process, for tests.
pub struct EchoTestServer {
    addr: ListenAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<sidecar::Result<()>>>,
}

impl EchoTestServer {
    /// Listens on an ephemeral loopback port.
    pub async fn start_tcp() -> sidecar::Result<Self> {
        Self::start(ListenAddr::Tcp(SocketAddr::from(([127, 0, 0, 1], 0)))).await
    }

    /// Listens on a local socket: `@name` or a filesystem path.
    pub async fn start_unix(socket: &str) -> sidecar::Result<Self> {
        Self::start(ListenAddr::Unix(UnixSocketAddr::parse(socket)?)).await
    }

    async fn start(addr: ListenAddr) -> sidecar::Result<Self> {
        let listener = Listener::bind(&addr).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = Server::new(crate::router());
        let task = tokio::spawn(async move {
            server
                .serve_with_shutdown(listener, async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> &ListenAddr {
        &self.addr
    }

    /// Address to pass to `--address` or `ClientOptions`.
    pub fn target(&self) -> String {
        self.addr.client_address()
    }

    pub fn client(&self) -> sidecar::Result<Client> {
        Client::new(ClientOptions::new(self.target()))
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for EchoTestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
