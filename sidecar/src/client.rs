mod bidi_stream;
mod client_stream;
mod server_stream;
mod unary;

pub use bidi_stream::{BidiReceiver, BidiSender, BidiStreamingCall};
pub use client_stream::ClientStreamingCall;
pub use server_stream::ServerStreamingCall;

use http::header::{CONTENT_TYPE, HeaderValue, TE};
use http::{Method, StatusCode, Version};
use hyper::body::Incoming;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::codec::{self, FrameReader};
use crate::metadata::{GRPC_CONTENT_TYPE, parse_header_line};
use crate::status::{GRPC_STATUS, error_for_trailer};
use crate::transport::{RequestBody, Target, Transport, TransportKind};
use crate::{ClientOptions, Code, Error, Metadata, Result, RpcMessage, Status};

/// A connection to one target address, reused for any number of calls.
///
/// Cloning is cheap and clones share the underlying connection pool, so a
/// `Client` can be handed to as many tasks as needed.
#[derive(Debug, Clone)]
pub struct Client {
    target: Target,
    base_url: String,
    headers: Metadata,
    transport: Transport,
}

impl Client {
    pub fn new(options: ClientOptions) -> Result<Self> {
        let target = Target::parse(&options.address)?;
        let transport = Transport::for_target(&target, &options)?;

        let mut headers = Metadata::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(GRPC_CONTENT_TYPE));
        headers.insert(TE, HeaderValue::from_static("trailers"));
        for line in &options.headers {
            match parse_header_line(line) {
                Some((name, value)) => {
                    headers.append(name, value);
                }
                None => debug!(line = %line, "ignoring malformed header override"),
            }
        }

        let base_url = target.base_url();
        debug!(url = %base_url, kind = %transport.kind(), "client created");

        Ok(Self {
            target,
            base_url,
            headers,
            transport,
        })
    }

    #[must_use]
    pub fn target(&self) -> &Target {
        &self.target
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers attached to every request.
    #[must_use]
    pub fn default_headers(&self) -> &Metadata {
        &self.headers
    }

    #[must_use]
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    fn build_request(
        &self,
        method: &str,
        metadata: &Metadata,
        body: RequestBody,
    ) -> Result<http::Request<RequestBody>> {
        if !method.starts_with('/') {
            return Err(Error::InvalidMethodPath(method.to_string()));
        }

        let mut req = http::Request::builder()
            .method(Method::POST)
            .uri(format!("{}{method}", self.base_url))
            .version(Version::HTTP_2)
            .body(body)?;

        let headers = req.headers_mut();
        headers.extend(self.headers.clone());
        for (name, value) in metadata {
            headers.append(name.clone(), value.clone());
        }
        Ok(req)
    }

    /// Issues the request on a background task so the caller can stream the
    /// request body while the exchange is in flight.
    fn spawn_request(&self, req: http::Request<RequestBody>) -> PendingResponse {
        let response = self.transport.request(req);
        PendingResponse {
            task: Some(tokio::spawn(async move { response.await.map_err(Error::from) })),
            reader: None,
            cancelled: false,
        }
    }
}

/// Inbound half of a call: decodes response frames and evaluates the
/// trailer once the body is drained.
#[derive(Debug)]
pub(crate) struct ResponseReader {
    status: StatusCode,
    headers: Metadata,
    frames: FrameReader<Incoming>,
    trailer: Option<Metadata>,
}

impl ResponseReader {
    pub(crate) fn new(response: http::Response<Incoming>) -> Self {
        let (parts, body) = response.into_parts();
        Self {
            status: parts.status,
            headers: parts.headers,
            frames: FrameReader::new(body),
            trailer: None,
        }
    }

    pub(crate) fn headers(&self) -> &Metadata {
        &self.headers
    }

    pub(crate) async fn receive<M: RpcMessage>(&mut self) -> Result<Option<M>> {
        if self.trailer.is_some() {
            return Ok(None);
        }
        codec::receive(&mut self.frames).await
    }

    /// Drains the body and evaluates the call outcome. Safe to call again;
    /// later calls re-evaluate the stored trailer.
    pub(crate) async fn close(&mut self) -> Result<Metadata> {
        if self.trailer.is_none() {
            self.frames.drain().await?;
            // Trailers-only responses carry the status in the headers.
            let trailer = self
                .frames
                .take_trailers()
                .unwrap_or_else(|| self.headers.clone());
            self.trailer = Some(trailer);
        }
        let trailer = self.trailer.clone().unwrap_or_default();

        let failure = if trailer.contains_key(GRPC_STATUS) || self.status == StatusCode::OK {
            error_for_trailer(&trailer)
        } else {
            Some(Status::new(
                Code::from_http_status(self.status),
                format!("unexpected HTTP status {}", self.status),
            ))
        };

        match failure {
            None => Ok(trailer),
            Some(status) => {
                debug!(code = %status.code(), message = status.message(), "call failed");
                Err(status.into())
            }
        }
    }

    pub(crate) fn trailer(&self) -> Option<&Metadata> {
        self.trailer.as_ref()
    }
}

/// The response of a request running on a background task.
///
/// Awaiting it is the barrier between the caller and that task: the response
/// reader only exists once the task has produced response headers. Dropping
/// it aborts the task and with it the HTTP exchange.
#[derive(Debug)]
pub(crate) struct PendingResponse {
    task: Option<JoinHandle<Result<http::Response<Incoming>>>>,
    reader: Option<ResponseReader>,
    cancelled: bool,
}

impl PendingResponse {
    pub(crate) async fn reader(&mut self) -> Result<&mut ResponseReader> {
        if self.cancelled {
            return Err(Error::Cancelled);
        }
        if self.reader.is_none() {
            let Some(task) = self.task.as_mut() else {
                return Err(Error::Closed);
            };
            let joined = task.await;
            self.task = None;

            let response = match joined {
                Ok(response) => response?,
                Err(err) if err.is_cancelled() => return Err(Error::Cancelled),
                Err(err) => return Err(Error::TaskFailed(err.to_string())),
            };
            self.reader = Some(ResponseReader::new(response));
        }
        self.reader.as_mut().ok_or(Error::Closed)
    }

    pub(crate) fn trailer(&self) -> Option<&Metadata> {
        self.reader.as_ref().and_then(ResponseReader::trailer)
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.reader = None;
        self.cancelled = true;
    }
}

impl Drop for PendingResponse {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
