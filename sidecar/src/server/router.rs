use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::handler::{self as adapt, Call};
use super::stream::{BidiStream, ClientStream, HandlerResult, ServerStream};
use crate::{Request, Response, RpcMessage};

type BoxFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Route = Arc<dyn Fn(Call) -> BoxFuture + Send + Sync>;

/// Maps full method paths (`/package.Service/Method`) to handlers.
///
/// ```ignore
/// let router = Router::new()
///     .unary("/echo.v1.Echo/Get", |req: Request<EchoRequest>| async move {
///         Ok(Response::new(EchoResponse { text: req.message.text }))
///     });
/// ```
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<String, Route>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn unary<Req, Res, F, Fut>(self, path: impl Into<String>, handler: F) -> Self
    where
        Req: RpcMessage,
        Res: RpcMessage,
        F: Fn(Request<Req>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Response<Res>>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.route(path, move |call| {
            Box::pin(adapt::unary(Arc::clone(&handler), call))
        })
    }

    #[must_use]
    pub fn server_streaming<Req, Res, F, Fut>(self, path: impl Into<String>, handler: F) -> Self
    where
        Req: RpcMessage,
        Res: RpcMessage,
        F: Fn(Request<Req>, ServerStream<Res>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.route(path, move |call| {
            Box::pin(adapt::server_streaming(Arc::clone(&handler), call))
        })
    }

    #[must_use]
    pub fn client_streaming<Req, Res, F, Fut>(self, path: impl Into<String>, handler: F) -> Self
    where
        Req: RpcMessage,
        Res: RpcMessage,
        F: Fn(ClientStream<Req>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Response<Res>>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.route(path, move |call| {
            Box::pin(adapt::client_streaming(Arc::clone(&handler), call))
        })
    }

    #[must_use]
    pub fn bidi_streaming<Req, Res, F, Fut>(self, path: impl Into<String>, handler: F) -> Self
    where
        Req: RpcMessage,
        Res: RpcMessage,
        F: Fn(BidiStream<Req, Res>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<()>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.route(path, move |call| {
            Box::pin(adapt::bidi_streaming(Arc::clone(&handler), call))
        })
    }

    #[must_use]
    pub fn has_route(&self, path: &str) -> bool {
        self.routes.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub(crate) fn get(&self, path: &str) -> Option<&Route> {
        self.routes.get(path)
    }

    fn route<F>(mut self, path: impl Into<String>, route: F) -> Self
    where
        F: Fn(Call) -> BoxFuture + Send + Sync + 'static,
    {
        self.routes.insert(path.into(), Arc::new(route));
        self
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<_> = self.paths().collect();
        paths.sort_unstable();
        f.debug_struct("Router").field("routes", &paths).finish()
    }
}
