mod handler;
mod listener;
mod router;
mod stream;

pub use listener::{ListenAddr, Listener};
pub use router::Router;
pub use stream::{BidiStream, ClientStream, HandlerResult, ServerStream};

use std::convert::Infallible;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::{BodyExt as _, Empty};
use hyper::body::Incoming;
use hyper::server::conn::http2;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, info, warn};

use self::handler::{Call, Responder};
use self::listener::Accepted;
use crate::body::{BoxedBody, DEFAULT_PIPE_CAPACITY, pipe};
use crate::codec::FrameReader;
use crate::metadata::GRPC_CONTENT_TYPE;
use crate::status::write_trailer;
use crate::{Result, Status};

const ACCEPT_BACKOFF_MIN: Duration = Duration::from_millis(5);
const ACCEPT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Serves a [`Router`] over HTTP/2 with prior knowledge. The same server
/// accepts TCP and local-socket listeners.
#[derive(Debug, Clone)]
pub struct Server {
    router: Arc<Router>,
}

impl Server {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
        }
    }

    /// Accepts connections until the task is dropped.
    pub async fn serve(&self, listener: Listener) -> Result<()> {
        self.serve_with_shutdown(listener, std::future::pending())
            .await
    }

    /// Accepts connections until `signal` resolves, then closes every open
    /// connection.
    pub async fn serve_with_shutdown<F>(&self, listener: Listener, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(addr = %listener.local_addr()?, "listening");

        let mut connections = JoinSet::new();
        let mut failures = 0u32;
        let mut paused = false;
        tokio::pin!(signal);
        loop {
            tokio::select! {
                () = &mut signal => {
                    debug!(open = connections.len(), "shutting down");
                    connections.shutdown().await;
                    return Ok(());
                }
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
                () = tokio::time::sleep(accept_backoff(failures)), if paused => {
                    paused = false;
                }
                accepted = listener.accept(), if !paused => {
                    let router = Arc::clone(&self.router);
                    match accepted {
                        Ok(Accepted::Tcp(stream, peer)) => {
                            failures = 0;
                            debug!(%peer, "accepted connection");
                            connections.spawn(serve_connection(stream, router));
                        }
                        Ok(Accepted::Unix(stream)) => {
                            failures = 0;
                            debug!("accepted local connection");
                            connections.spawn(serve_connection(stream, router));
                        }
                        Err(err) => {
                            failures = failures.saturating_add(1);
                            paused = true;
                            warn!(
                                backoff = ?accept_backoff(failures),
                                "accept failed: {err}"
                            );
                        }
                    }
                }
            }
        }
    }
}

/// Pause before accepting again after `failures` consecutive accept errors.
fn accept_backoff(failures: u32) -> Duration {
    let shift = failures.saturating_sub(1).min(10);
    ACCEPT_BACKOFF_MIN
        .saturating_mul(1 << shift)
        .min(ACCEPT_BACKOFF_MAX)
}

/// Handler tasks started on one connection.
#[derive(Clone, Default)]
struct CallTasks(Arc<Mutex<JoinSet<()>>>);

impl CallTasks {
    fn spawn<F>(&self, call: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(call)
    }

    fn abort_all(&self) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}

/// Aborts every handler of a connection once the connection is gone, whether
/// it closed or its task was aborted at shutdown.
struct AbortOnClose(CallTasks);

impl Drop for AbortOnClose {
    fn drop(&mut self) {
        self.0.abort_all();
    }
}

async fn serve_connection<S>(stream: S, router: Arc<Router>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let calls = CallTasks::default();
    let _abort = AbortOnClose(calls.clone());
    let service = service_fn(move |req| dispatch(Arc::clone(&router), calls.clone(), req));
    let result = http2::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), service)
        .await;
    match result {
        Ok(()) => debug!("connection closed"),
        Err(err) => debug!("connection closed with error: {err}"),
    }
}

/// Routes one request. The response (headers plus a streaming body) is
/// returned right away; the handler runs on its own task and feeds the body.
/// That task ends with the call: it is aborted when hyper drops the body
/// after a stream reset, and with the connection.
async fn dispatch(
    router: Arc<Router>,
    calls: CallTasks,
    req: http::Request<Incoming>,
) -> std::result::Result<http::Response<BoxedBody>, Infallible> {
    let (parts, body) = req.into_parts();
    let method = parts.uri.path().to_string();

    if parts.method != Method::POST {
        return Ok(trailers_only(&Status::unimplemented(format!(
            "{} is not supported",
            parts.method
        ))));
    }
    let Some(route) = router.get(&method) else {
        debug!(%method, "unknown method");
        return Ok(trailers_only(&Status::unimplemented(format!(
            "unknown method {method}"
        ))));
    };

    debug!(%method, "call started");
    let (sink, response_body) = pipe(DEFAULT_PIPE_CAPACITY);
    let call = Call {
        metadata: parts.headers,
        frames: FrameReader::new(body),
        responder: Responder { method, sink },
    };
    let handler = calls.spawn(route(call));

    Ok(grpc_response(response_body.abort_on_drop(handler).boxed()))
}

fn grpc_response(body: BoxedBody) -> http::Response<BoxedBody> {
    let mut response = http::Response::new(body);
    *response.status_mut() = StatusCode::OK;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(GRPC_CONTENT_TYPE));
    response
}

/// A response whose headers carry the status and that has no body.
fn trailers_only(status: &Status) -> http::Response<BoxedBody> {
    let mut response = grpc_response(Empty::<Bytes>::new().boxed());
    write_trailer(response.headers_mut(), Some(status));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Code;
    use crate::status::code_from_metadata;

    #[test]
    fn accept_backoff_doubles_up_to_a_cap() {
        assert_eq!(accept_backoff(1), Duration::from_millis(5));
        assert_eq!(accept_backoff(2), Duration::from_millis(10));
        assert_eq!(accept_backoff(4), Duration::from_millis(40));
        assert_eq!(accept_backoff(9), ACCEPT_BACKOFF_MAX);
        assert_eq!(accept_backoff(u32::MAX), ACCEPT_BACKOFF_MAX);
    }

    #[tokio::test]
    async fn closing_a_connection_aborts_its_handlers() {
        let calls = CallTasks::default();
        let handler = calls.spawn(std::future::pending());
        drop(AbortOnClose(calls.clone()));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handler.is_finished());
    }

    #[test]
    fn trailers_only_response_carries_the_status_in_headers() {
        let response = trailers_only(&Status::unimplemented("unknown method /x.Y/Z"));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(code_from_metadata(response.headers()), Code::Unimplemented);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).map(HeaderValue::as_bytes),
            Some(GRPC_CONTENT_TYPE.as_bytes())
        );
        assert!(hyper::body::Body::is_end_stream(response.body()));
    }
}
