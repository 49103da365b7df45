use std::future::Future;
use std::sync::Arc;

use hyper::body::Incoming;
use tracing::debug;

use super::stream::{BidiStream, ClientStream, HandlerResult, ServerStream};
use crate::body::BodySender;
use crate::codec::{self, FrameReader};
use crate::status::{merge_metadata, write_trailer};
use crate::{Metadata, Request, Response, RpcMessage, Status};

/// One inbound call, routed and ready for its adapter.
#[derive(Debug)]
pub(crate) struct Call {
    pub(crate) metadata: Metadata,
    pub(crate) frames: FrameReader<Incoming>,
    pub(crate) responder: Responder,
}

/// Outbound half of a call: writes response frames and, last, the trailer.
#[derive(Debug)]
pub(crate) struct Responder {
    pub(crate) method: String,
    pub(crate) sink: BodySender,
}

impl Responder {
    async fn send_single<Res: RpcMessage>(&self, message: &Res) -> HandlerResult<()> {
        let framed = codec::serialize(message)?;
        self.sink.send_data(framed).await?;
        Ok(())
    }

    /// Writes the trailer for `outcome`. Consumes the responder, so a trailer
    /// goes out at most once.
    pub(crate) async fn finish(self, outcome: HandlerResult<Metadata>) {
        let mut trailer = Metadata::new();
        match &outcome {
            Ok(extra) => {
                merge_metadata(&mut trailer, extra);
                write_trailer(&mut trailer, None);
            }
            Err(status) => {
                debug!(
                    method = %self.method,
                    code = %status.code(),
                    message = status.message(),
                    "call failed"
                );
                write_trailer(&mut trailer, Some(status));
            }
        }

        if let Err(err) = self.sink.send_trailers(trailer).await {
            debug!(method = %self.method, "client went away before the trailer: {err}");
        }
    }
}

/// Reads the one request message unary and server-streaming calls carry.
async fn read_single<Req: RpcMessage>(frames: &mut FrameReader<Incoming>) -> HandlerResult<Req> {
    match codec::receive(frames).await {
        Ok(Some(message)) => Ok(message),
        Ok(None) => Err(Status::invalid_argument("request contained no message")),
        Err(err) => Err(Status::invalid_argument(format!(
            "failed to read request: {err}"
        ))),
    }
}

pub(crate) async fn unary<Req, Res, F, Fut>(handler: Arc<F>, call: Call)
where
    Req: RpcMessage,
    Res: RpcMessage,
    F: Fn(Request<Req>) -> Fut,
    Fut: Future<Output = HandlerResult<Response<Res>>>,
{
    let Call {
        metadata,
        mut frames,
        responder,
    } = call;

    let outcome = async {
        let message = read_single::<Req>(&mut frames).await?;
        let response = handler(Request { message, metadata }).await?;
        responder.send_single(&response.message).await?;
        Ok::<_, Status>(response.trailer)
    }
    .await;
    responder.finish(outcome).await;
}

pub(crate) async fn server_streaming<Req, Res, F, Fut>(handler: Arc<F>, call: Call)
where
    Req: RpcMessage,
    Res: RpcMessage,
    F: Fn(Request<Req>, ServerStream<Res>) -> Fut,
    Fut: Future<Output = HandlerResult<()>>,
{
    let Call {
        metadata,
        mut frames,
        responder,
    } = call;

    let outcome = async {
        let message = read_single::<Req>(&mut frames).await?;
        let stream = ServerStream::new(responder.sink.clone());
        handler(Request { message, metadata }, stream).await?;
        Ok::<_, Status>(Metadata::new())
    }
    .await;
    responder.finish(outcome).await;
}

pub(crate) async fn client_streaming<Req, Res, F, Fut>(handler: Arc<F>, call: Call)
where
    Req: RpcMessage,
    Res: RpcMessage,
    F: Fn(ClientStream<Req>) -> Fut,
    Fut: Future<Output = HandlerResult<Response<Res>>>,
{
    let Call {
        metadata,
        frames,
        responder,
    } = call;

    let outcome = async {
        let response = handler(ClientStream::new(metadata, frames)).await?;
        responder.send_single(&response.message).await?;
        Ok::<_, Status>(response.trailer)
    }
    .await;
    responder.finish(outcome).await;
}

pub(crate) async fn bidi_streaming<Req, Res, F, Fut>(handler: Arc<F>, call: Call)
where
    Req: RpcMessage,
    Res: RpcMessage,
    F: Fn(BidiStream<Req, Res>) -> Fut,
    Fut: Future<Output = HandlerResult<()>>,
{
    let Call {
        metadata,
        frames,
        responder,
    } = call;

    let stream = BidiStream::new(
        ClientStream::new(metadata, frames),
        ServerStream::new(responder.sink.clone()),
    );
    let outcome = handler(stream).await.map(|()| Metadata::new());
    responder.finish(outcome).await;
}
