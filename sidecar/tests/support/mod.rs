#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use sidecar::{
    BidiStream, Client, ClientOptions, ClientStream, ListenAddr, Listener, Request, Response,
    Router, Server, ServerStream, Status, UnixSocketAddr,
};
use tokio::sync::oneshot;

pub const ECHO: &str = "/test.v1.Notes/Echo";
pub const SPLIT: &str = "/test.v1.Notes/Split";
pub const JOIN: &str = "/test.v1.Notes/Join";
pub const CHAT: &str = "/test.v1.Notes/Chat";
pub const FAIL: &str = "/test.v1.Notes/Fail";
pub const FAIL_STREAM: &str = "/test.v1.Notes/FailStream";
pub const STALL: &str = "/test.v1.Notes/Stall";
pub const HEADERS: &str = "/test.v1.Notes/Headers";

#[derive(Clone, PartialEq, prost::Message)]
pub struct Note {
    #[prost(string, tag = "1")]
    pub text: String,
}

pub fn note(text: impl Into<String>) -> Note {
    Note { text: text.into() }
}

async fn echo(req: Request<Note>) -> Result<Response<Note>, Status> {
    Ok(Response::new(note(format!("echo:{}", req.message.text))))
}

async fn split(req: Request<Note>, stream: ServerStream<Note>) -> Result<(), Status> {
    for part in req.message.text.split(' ') {
        stream.send(&note(part)).await?;
    }
    Ok(())
}

async fn join(mut stream: ClientStream<Note>) -> Result<Response<Note>, Status> {
    let mut parts = Vec::new();
    while let Some(msg) = stream.receive().await? {
        parts.push(msg.text);
    }
    Ok(Response::new(note(parts.join(" "))))
}

async fn chat(mut stream: BidiStream<Note, Note>) -> Result<(), Status> {
    while let Some(msg) = stream.receive().await? {
        stream.send(&note(format!("re:{}", msg.text))).await?;
    }
    Ok(())
}

async fn fail(req: Request<Note>) -> Result<Response<Note>, Status> {
    Err(Status::not_found(format!("no note named {}", req.message.text)))
}

async fn fail_stream(req: Request<Note>, stream: ServerStream<Note>) -> Result<(), Status> {
    stream.send(&note(req.message.text)).await?;
    Err(Status::failed_precondition("stream broke: 100% done?"))
}

/// Never reads its input, so a client that keeps sending eventually stalls.
async fn stall(_stream: ClientStream<Note>) -> Result<Response<Note>, Status> {
    std::future::pending::<()>().await;
    Ok(Response::new(note("unreachable")))
}

/// Echoes the `x-note` request header and adds a trailer entry.
async fn headers(req: Request<Note>) -> Result<Response<Note>, Status> {
    let value = req
        .metadata
        .get("x-note")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let mut response = Response::new(note(value));
    response
        .trailer
        .insert("x-served-by", http::HeaderValue::from_static("notes"));
    Ok(response)
}

pub fn router() -> Router {
    Router::new()
        .unary(ECHO, echo)
        .server_streaming(SPLIT, split)
        .client_streaming(JOIN, join)
        .bidi_streaming(CHAT, chat)
        .unary(FAIL, fail)
        .server_streaming(FAIL_STREAM, fail_stream)
        .client_streaming(STALL, stall)
        .unary(HEADERS, headers)
}

pub struct TestServer {
    addr: ListenAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<sidecar::Result<()>>>,
}

impl TestServer {
    pub async fn start_tcp() -> sidecar::Result<Self> {
        Self::start(ListenAddr::Tcp(SocketAddr::from(([127, 0, 0, 1], 0)))).await
    }

    pub async fn start_unix(addr: UnixSocketAddr) -> sidecar::Result<Self> {
        Self::start(ListenAddr::Unix(addr)).await
    }

    async fn start(addr: ListenAddr) -> sidecar::Result<Self> {
        let listener = Listener::bind(&addr).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = Server::new(router());
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

    pub fn address(&self) -> String {
        self.addr.client_address()
    }

    pub fn client(&self) -> Client {
        Client::new(ClientOptions::new(self.address()))
            .unwrap_or_else(|e| panic!("client for {}: {e}", self.address()))
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

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// A fresh abstract socket name per call, unique across tests in this process.
pub fn unique_abstract_socket() -> UnixSocketAddr {
    static NEXT: AtomicUsize = AtomicUsize::new(0);
    let n = NEXT.fetch_add(1, Ordering::Relaxed);
    UnixSocketAddr::Abstract(format!("sidecar-e2e-{}-{n}", std::process::id()))
}
