use std::marker::PhantomData;

use http_body_util::{BodyExt as _, Full};
use tracing::debug;

use super::{Client, ResponseReader};
use crate::{Metadata, Request, Result, RpcMessage, codec};

impl Client {
    /// Sends one message and returns a cursor over the response stream once
    /// response headers have arrived.
    pub async fn server_streaming<Req, Res>(
        &self,
        method: &str,
        request: Request<Req>,
    ) -> Result<ServerStreamingCall<Res>>
    where
        Req: RpcMessage,
        Res: RpcMessage,
    {
        let body = Full::new(codec::serialize(&request.message)?).boxed();
        let req = self.build_request(method, &request.metadata, body)?;

        debug!(method, "server-streaming call");
        let response = self.transport.request(req).await?;

        Ok(ServerStreamingCall {
            reader: ResponseReader::new(response),
            _message: PhantomData,
        })
    }
}

/// Receive side of a server-streaming call.
///
/// `receive` yields messages until the server finishes; the outcome of the
/// call is only known after `close_response`.
#[derive(Debug)]
pub struct ServerStreamingCall<Res> {
    reader: ResponseReader,
    _message: PhantomData<fn() -> Res>,
}

impl<Res: RpcMessage> ServerStreamingCall<Res> {
    pub async fn receive(&mut self) -> Result<Option<Res>> {
        self.reader.receive().await
    }

    /// Drains whatever is left and evaluates the trailer.
    pub async fn close_response(&mut self) -> Result<()> {
        self.reader.close().await.map(drop)
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &Metadata {
        self.reader.headers()
    }

    /// Available after `close_response`.
    #[must_use]
    pub fn trailer(&self) -> Option<&Metadata> {
        self.reader.trailer()
    }

    /// Abandons the call, resetting the HTTP/2 stream.
    pub fn cancel(self) {
        drop(self);
    }
}
