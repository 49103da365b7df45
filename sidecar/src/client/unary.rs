use http_body_util::{BodyExt as _, Full};
use tracing::debug;

use super::{Client, ResponseReader};
use crate::{Error, Request, Response, Result, RpcMessage, codec};

impl Client {
    /// Sends one message and waits for exactly one back.
    ///
    /// The trailer is evaluated before the message is returned, so a non-OK
    /// status wins over whatever the body contained.
    pub async fn unary<Req, Res>(&self, method: &str, request: Request<Req>) -> Result<Response<Res>>
    where
        Req: RpcMessage,
        Res: RpcMessage,
    {
        let body = Full::new(codec::serialize(&request.message)?).boxed();
        let req = self.build_request(method, &request.metadata, body)?;

        debug!(method, "unary call");
        let response = self.transport.request(req).await?;

        let mut reader = ResponseReader::new(response);
        let message = reader.receive::<Res>().await;
        let trailer = reader.close().await?;
        let message = message?.ok_or(Error::MissingMessage)?;

        Ok(Response { message, trailer })
    }
}
