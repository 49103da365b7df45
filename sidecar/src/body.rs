use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Frame, SizeHint};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::{Error, Metadata, Result};

/// Type-erased body used for outbound requests and server responses.
pub type BoxedBody = BoxBody<Bytes, Infallible>;

/// Frames buffered between a writer and the HTTP stack before `send_data`
/// starts waiting on the peer.
pub const DEFAULT_PIPE_CAPACITY: usize = 16;

/// Creates a bounded duplex pipe: frames written to the sender become the
/// HTTP body polled by hyper, in order.
///
/// A full pipe suspends the writer until the peer reads, so a stalled peer
/// throttles the sender instead of growing memory.
#[must_use]
pub fn pipe(capacity: usize) -> (BodySender, ChannelBody) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (BodySender { tx: Some(tx) }, ChannelBody { rx, producer: None })
}

/// Write half of a [`pipe`].
///
/// There is no buffering layer between this sender and the HTTP stack, so
/// every write is already flushed once it returns. Clones feed the same body,
/// which ends once every clone is closed or dropped.
#[derive(Debug, Clone)]
pub struct BodySender {
    tx: Option<mpsc::Sender<Frame<Bytes>>>,
}

impl BodySender {
    pub async fn send_data(&self, data: Bytes) -> Result<()> {
        self.send_frame(Frame::data(data)).await
    }

    pub async fn send_trailers(&self, trailers: Metadata) -> Result<()> {
        self.send_frame(Frame::trailers(trailers)).await
    }

    async fn send_frame(&self, frame: Frame<Bytes>) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(Error::Closed)?;
        tx.send(frame).await.map_err(|_| Error::Closed)
    }

    /// Ends the body. Later writes fail with `Error::Closed`.
    pub fn close(&mut self) {
        self.tx.take();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.as_ref().is_none_or(mpsc::Sender::is_closed)
    }
}

/// Read half of a [`pipe`], polled by hyper as a request or response body.
#[derive(Debug)]
pub struct ChannelBody {
    rx: mpsc::Receiver<Frame<Bytes>>,
    producer: Option<AbortHandle>,
}

impl ChannelBody {
    /// Ties the task feeding this body to it: dropping the body (the peer
    /// reset the stream, or the connection went away) aborts the task.
    #[must_use]
    pub fn abort_on_drop(mut self, producer: AbortHandle) -> Self {
        self.producer = Some(producer);
        self
    }
}

impl Drop for ChannelBody {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<std::result::Result<Frame<Self::Data>, Self::Error>>> {
        self.rx.poll_recv(cx).map(|frame| frame.map(Ok))
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt as _;
    use std::time::Duration;

    #[tokio::test]
    async fn frames_arrive_in_order_and_close_ends_the_body() -> Result<()> {
        let (mut tx, mut body) = pipe(4);
        tx.send_data(Bytes::from_static(b"one")).await?;
        tx.send_data(Bytes::from_static(b"two")).await?;
        tx.close();

        let mut seen = Vec::new();
        while let Some(frame) = body.frame().await {
            let Ok(frame) = frame;
            if let Ok(data) = frame.into_data() {
                seen.push(data);
            }
        }
        assert_eq!(seen, vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")]);
        assert!(matches!(tx.send_data(Bytes::new()).await, Err(Error::Closed)));
        Ok(())
    }

    #[tokio::test]
    async fn full_pipe_blocks_the_writer() -> Result<()> {
        let (tx, _body) = pipe(2);
        tx.send_data(Bytes::from_static(b"a")).await?;
        tx.send_data(Bytes::from_static(b"b")).await?;

        let blocked =
            tokio::time::timeout(Duration::from_millis(50), tx.send_data(Bytes::new())).await;
        assert!(blocked.is_err(), "third write should wait for the reader");
        Ok(())
    }

    #[tokio::test]
    async fn dropping_the_body_aborts_its_producer() {
        let (tx, body) = pipe(1);
        let producer = tokio::spawn(async move {
            while tx.send_data(Bytes::from_static(b"tick")).await.is_ok() {}
            std::future::pending::<()>().await;
        });
        let body = body.abort_on_drop(producer.abort_handle());
        drop(body);

        let joined = tokio::time::timeout(Duration::from_secs(1), producer).await;
        match joined {
            Ok(Err(err)) => assert!(err.is_cancelled()),
            other => panic!("expected an aborted producer, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropped_reader_fails_writes() {
        let (tx, body) = pipe(2);
        drop(body);
        assert!(tx.is_closed());
        assert!(matches!(
            tx.send_data(Bytes::from_static(b"x")).await,
            Err(Error::Closed)
        ));
    }
}
