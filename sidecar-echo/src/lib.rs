//! The `echo.v1.Echo` service: one method per call shape.

mod test_server;

pub use test_server::EchoTestServer;

use serde::{Deserialize, Serialize};
use sidecar::{
    BidiStream, ClientStream, HandlerResult, Request, Response, Router, ServerStream,
};
use tracing::debug;

pub const GET: &str = "/echo.v1.Echo/Get";
pub const EXPAND: &str = "/echo.v1.Echo/Expand";
pub const COLLECT: &str = "/echo.v1.Echo/Collect";
pub const UPDATE: &str = "/echo.v1.Echo/Update";

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct EchoRequest {
    #[prost(string, tag = "1")]
    pub text: String,
}

impl EchoRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Clone, PartialEq, Eq, prost::Message, Serialize, Deserialize)]
pub struct EchoResponse {
    #[prost(string, tag = "1")]
    pub text: String,
}

impl EchoResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

pub async fn get(req: Request<EchoRequest>) -> HandlerResult<Response<EchoResponse>> {
    Ok(Response::new(EchoResponse::new(format!(
        "Rust echo get: {}",
        req.message.text
    ))))
}

pub async fn expand(req: Request<EchoRequest>, stream: ServerStream<EchoResponse>) -> HandlerResult<()> {
    for part in req.message.text.split(' ') {
        stream
            .send(&EchoResponse::new(format!("Rust echo expand: {part}")))
            .await?;
    }
    Ok(())
}

pub async fn collect(mut stream: ClientStream<EchoRequest>) -> HandlerResult<Response<EchoResponse>> {
    let mut parts = Vec::new();
    while let Some(request) = stream.receive().await? {
        parts.push(request.text);
    }
    debug!(count = parts.len(), "collected");
    Ok(Response::new(EchoResponse::new(format!(
        "Rust echo collect: {}",
        parts.join(" ")
    ))))
}

pub async fn update(mut stream: BidiStream<EchoRequest, EchoResponse>) -> HandlerResult<()> {
    while let Some(request) = stream.receive().await? {
        stream
            .send(&EchoResponse::new(format!("Rust echo update: {}", request.text)))
            .await?;
    }
    Ok(())
}

#[must_use]
pub fn router() -> Router {
    Router::new()
        .unary(GET, get)
        .server_streaming(EXPAND, expand)
        .client_streaming(COLLECT, collect)
        .bidi_streaming(UPDATE, update)
}
