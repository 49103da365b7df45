use std::marker::PhantomData;

use http_body_util::BodyExt as _;
use tracing::debug;

use super::{Client, PendingResponse};
use crate::body::{BodySender, DEFAULT_PIPE_CAPACITY, pipe};
use crate::{Error, Metadata, Result, RpcMessage, codec};

impl Client {
    /// Opens a client-streaming call. The request is already in flight when
    /// this returns; messages written with `send` stream to the server as
    /// they are produced.
    pub fn client_streaming<Req, Res>(&self, method: &str) -> Result<ClientStreamingCall<Req, Res>>
    where
        Req: RpcMessage,
        Res: RpcMessage,
    {
        self.client_streaming_with_metadata(method, &Metadata::new())
    }

    pub fn client_streaming_with_metadata<Req, Res>(
        &self,
        method: &str,
        metadata: &Metadata,
    ) -> Result<ClientStreamingCall<Req, Res>>
    where
        Req: RpcMessage,
        Res: RpcMessage,
    {
        let (sender, body) = pipe(DEFAULT_PIPE_CAPACITY);
        let req = self.build_request(method, metadata, body.boxed())?;

        debug!(method, "client-streaming call");
        Ok(ClientStreamingCall {
            sender,
            response: self.spawn_request(req),
            _message: PhantomData,
        })
    }
}

#[derive(Debug)]
pub struct ClientStreamingCall<Req, Res> {
    sender: BodySender,
    response: PendingResponse,
    _message: PhantomData<fn(Req) -> Res>,
}

impl<Req, Res> ClientStreamingCall<Req, Res>
where
    Req: RpcMessage,
    Res: RpcMessage,
{
    /// Waits while the server is not keeping up with the stream.
    pub async fn send(&self, message: &Req) -> Result<()> {
        codec::send(&self.sender, message).await
    }

    /// Ends the request stream, then waits for the single response and the
    /// trailer.
    pub async fn close_and_receive(&mut self) -> Result<Res> {
        self.sender.close();

        let reader = self.response.reader().await?;
        let message = reader.receive::<Res>().await;
        reader.close().await?;
        message?.ok_or(Error::MissingMessage)
    }

    /// Available after `close_and_receive`.
    #[must_use]
    pub fn trailer(&self) -> Option<&Metadata> {
        self.response.trailer()
    }

    /// Aborts the request task; pending and later operations fail with
    /// `Error::Cancelled` or `Error::Closed`.
    pub fn cancel(&mut self) {
        self.sender.close();
        self.response.cancel();
    }
}
