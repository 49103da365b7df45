use std::marker::PhantomData;

use http_body_util::BodyExt as _;
use tracing::debug;

use super::{Client, PendingResponse};
use crate::body::{BodySender, DEFAULT_PIPE_CAPACITY, pipe};
use crate::{Metadata, Result, RpcMessage, codec};

impl Client {
    /// Opens a bidirectional call. Sending and receiving are independent; use
    /// [`BidiStreamingCall::split`] to drive them from separate tasks.
    pub fn bidi_streaming<Req, Res>(&self, method: &str) -> Result<BidiStreamingCall<Req, Res>>
    where
        Req: RpcMessage,
        Res: RpcMessage,
    {
        self.bidi_streaming_with_metadata(method, &Metadata::new())
    }

    pub fn bidi_streaming_with_metadata<Req, Res>(
        &self,
        method: &str,
        metadata: &Metadata,
    ) -> Result<BidiStreamingCall<Req, Res>>
    where
        Req: RpcMessage,
        Res: RpcMessage,
    {
        let (sender, body) = pipe(DEFAULT_PIPE_CAPACITY);
        let req = self.build_request(method, metadata, body.boxed())?;

        debug!(method, "bidi-streaming call");
        Ok(BidiStreamingCall {
            sender: BidiSender {
                sender,
                _message: PhantomData,
            },
            receiver: BidiReceiver {
                response: self.spawn_request(req),
                _message: PhantomData,
            },
        })
    }
}

#[derive(Debug)]
pub struct BidiStreamingCall<Req, Res> {
    sender: BidiSender<Req>,
    receiver: BidiReceiver<Res>,
}

impl<Req, Res> BidiStreamingCall<Req, Res>
where
    Req: RpcMessage,
    Res: RpcMessage,
{
    pub async fn send(&self, message: &Req) -> Result<()> {
        self.sender.send(message).await
    }

    pub async fn receive(&mut self) -> Result<Option<Res>> {
        self.receiver.receive().await
    }

    /// Ends the request stream and waits for the request task to finish.
    pub async fn close_request(&mut self) -> Result<()> {
        self.sender.close();
        self.receiver.response.reader().await.map(drop)
    }

    pub async fn close_response(&mut self) -> Result<()> {
        self.receiver.close_response().await
    }

    #[must_use]
    pub fn trailer(&self) -> Option<&Metadata> {
        self.receiver.trailer()
    }

    pub fn cancel(&mut self) {
        self.sender.close();
        self.receiver.cancel();
    }

    pub fn split(self) -> (BidiSender<Req>, BidiReceiver<Res>) {
        (self.sender, self.receiver)
    }
}

/// Send half of a bidi call. Dropping it ends the request stream.
#[derive(Debug)]
pub struct BidiSender<Req> {
    sender: BodySender,
    _message: PhantomData<fn(Req)>,
}

impl<Req: RpcMessage> BidiSender<Req> {
    pub async fn send(&self, message: &Req) -> Result<()> {
        codec::send(&self.sender, message).await
    }

    pub fn close(&mut self) {
        self.sender.close();
    }
}

/// Receive half of a bidi call. Dropping it aborts the call.
#[derive(Debug)]
pub struct BidiReceiver<Res> {
    response: PendingResponse,
    _message: PhantomData<fn() -> Res>,
}

impl<Res: RpcMessage> BidiReceiver<Res> {
    /// Waits for response headers on first use, then yields one message per
    /// call until the server finishes.
    pub async fn receive(&mut self) -> Result<Option<Res>> {
        self.response.reader().await?.receive().await
    }

    pub async fn close_response(&mut self) -> Result<()> {
        self.response.reader().await?.close().await.map(drop)
    }

    #[must_use]
    pub fn trailer(&self) -> Option<&Metadata> {
        self.response.trailer()
    }

    pub fn cancel(&mut self) {
        self.response.cancel();
    }
}
