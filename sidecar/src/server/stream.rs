use std::marker::PhantomData;

use hyper::body::Incoming;

use crate::body::BodySender;
use crate::codec::{self, FrameReader};
use crate::{Metadata, RpcMessage, Status};

/// What a handler returns: its result, or the status to report instead.
pub type HandlerResult<T> = std::result::Result<T, Status>;

/// Send side of a server-streaming or bidi call.
#[derive(Debug)]
pub struct ServerStream<Res> {
    sink: BodySender,
    _message: PhantomData<fn(Res)>,
}

impl<Res: RpcMessage> ServerStream<Res> {
    pub(crate) fn new(sink: BodySender) -> Self {
        Self {
            sink,
            _message: PhantomData,
        }
    }

    /// Frames and writes one message. Waits while the client is not reading;
    /// fails once the client has gone away.
    pub async fn send(&self, message: &Res) -> HandlerResult<()> {
        codec::send(&self.sink, message).await.map_err(Status::from)
    }
}

/// Receive side of a client-streaming or bidi call.
#[derive(Debug)]
pub struct ClientStream<Req> {
    metadata: Metadata,
    frames: FrameReader<Incoming>,
    _message: PhantomData<fn() -> Req>,
}

impl<Req: RpcMessage> ClientStream<Req> {
    pub(crate) fn new(metadata: Metadata, frames: FrameReader<Incoming>) -> Self {
        Self {
            metadata,
            frames,
            _message: PhantomData,
        }
    }

    /// Next request message, `None` once the client closed its side.
    ///
    /// Malformed input is reported as `InvalidArgument`, so handlers can
    /// simply propagate it with `?`.
    pub async fn receive(&mut self) -> HandlerResult<Option<Req>> {
        codec::receive(&mut self.frames)
            .await
            .map_err(|err| Status::invalid_argument(format!("failed to read request: {err}")))
    }

    /// Request headers.
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// Both sides of a bidi call. The handler decides how sends and receives
/// interleave; `split` allows driving them from separate tasks.
#[derive(Debug)]
pub struct BidiStream<Req, Res> {
    inbound: ClientStream<Req>,
    outbound: ServerStream<Res>,
}

impl<Req: RpcMessage, Res: RpcMessage> BidiStream<Req, Res> {
    pub(crate) fn new(inbound: ClientStream<Req>, outbound: ServerStream<Res>) -> Self {
        Self { inbound, outbound }
    }

    pub async fn receive(&mut self) -> HandlerResult<Option<Req>> {
        self.inbound.receive().await
    }

    pub async fn send(&self, message: &Res) -> HandlerResult<()> {
        self.outbound.send(message).await
    }

    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        self.inbound.metadata()
    }

    pub fn split(self) -> (ClientStream<Req>, ServerStream<Res>) {
        (self.inbound, self.outbound)
    }
}
