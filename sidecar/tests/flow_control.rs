mod support;

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use sidecar::{
    Client, ClientOptions, Code, Error, ListenAddr, Listener, Request, Response, Router, Server,
    Status,
};
use support::{JOIN, Note, STALL, TestServer, note};
use tokio::sync::{Notify, oneshot};

const SLEEP: &str = "/test.v1.Notes/Sleep";

/// Sets its flag when dropped.
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn shutdown_drops_running_handlers() -> Result<()> {
    let dropped = Arc::new(AtomicBool::new(false));
    let entered = Arc::new(Notify::new());

    let router = Router::new().unary(SLEEP, {
        let dropped = Arc::clone(&dropped);
        let entered = Arc::clone(&entered);
        move |_req: Request<Note>| {
            let flag = DropFlag(Arc::clone(&dropped));
            let entered = Arc::clone(&entered);
            async move {
                let _flag = flag;
                entered.notify_one();
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok::<_, Status>(Response::new(note("late")))
            }
        }
    });

    let listener = Listener::bind(&ListenAddr::Tcp(SocketAddr::from(([127, 0, 0, 1], 0)))).await?;
    let address = listener.local_addr()?.client_address();
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        Server::new(router)
            .serve_with_shutdown(listener, async move {
                let _ = stop_rx.await;
            })
            .await
    });

    let client = Client::new(ClientOptions::new(address))?;
    let call = tokio::spawn(async move {
        client
            .unary::<Note, Note>(SLEEP, Request::new(note("zzz")))
            .await
    });

    tokio::time::timeout(Duration::from_secs(2), entered.notified()).await?;
    assert!(!dropped.load(Ordering::SeqCst));

    let _ = stop_tx.send(());
    server.await??;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
    while !dropped.load(Ordering::SeqCst) && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(dropped.load(Ordering::SeqCst), "handler outlived the server");

    let outcome = tokio::time::timeout(Duration::from_secs(2), call).await??;
    assert!(outcome.is_err());
    Ok(())
}

#[tokio::test]
async fn unread_client_stream_blocks_the_sender() -> Result<()> {
    let server = TestServer::start_tcp().await?;
    let client = server.client();

    let mut call = client.client_streaming::<Note, Note>(STALL)?;
    let big = note("x".repeat(64 * 1024));

    let sent = tokio::time::timeout(Duration::from_secs(2), async {
        for _ in 0..2_000 {
            call.send(&big).await?;
        }
        Ok::<_, Error>(())
    })
    .await;
    assert!(sent.is_err(), "sender should stall once the peer stops reading");

    call.cancel();
    Ok(())
}

#[tokio::test]
async fn cancelled_call_reports_cancelled() -> Result<()> {
    let server = TestServer::start_tcp().await?;
    let client = server.client();

    let mut call = client.client_streaming::<Note, Note>(JOIN)?;
    call.send(&note("hello")).await?;
    call.cancel();

    let err = call
        .close_and_receive()
        .await
        .err()
        .ok_or_else(|| anyhow::anyhow!("expected failure"))?;
    assert_eq!(err.code(), Code::Cancelled);
    Ok(())
}

#[tokio::test]
async fn bidi_cancel_stops_receiving() -> Result<()> {
    let server = TestServer::start_tcp().await?;
    let client = server.client();

    let mut call = client.bidi_streaming::<Note, Note>(support::CHAT)?;
    call.send(&note("one")).await?;
    assert_eq!(call.receive().await?, Some(note("re:one")));

    call.cancel();
    assert!(matches!(call.receive().await, Err(Error::Cancelled)));
    assert!(matches!(call.send(&note("two")).await, Err(Error::Closed)));
    Ok(())
}
