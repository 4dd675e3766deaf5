//! Middleware pipeline — composable before/after request handler logic.
//!
//! A [`Pipeline`] runs an ordered stack of [`Middleware`] in front of a
//! single endpoint (normally the [`Router`](crate::Router)). Each middleware
//! receives a [`Next`] cursor and decides whether to call further down the
//! chain.

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::time::Instant;
use tracing::info;

use crate::router::{Handler, IntoHandler};
use crate::{Request, Response, context::Context};

/// Type-erased, cheaply cloneable middleware function.
pub type MiddlewareHandler = Arc<
    dyn Fn(Context, Next) -> Pin<Box<dyn Future<Output = Response> + Send>> + Send + Sync + 'static,
>;

/// Wraps a [`Middleware`] implementation as a [`MiddlewareHandler`].
pub fn from_middleware<M>(middleware: Arc<M>) -> MiddlewareHandler
where
    M: Middleware + 'static,
{
    Arc::new(move |ctx: Context, next: Next| middleware.handle(ctx, next))
}

/// The core middleware trait.
///
/// Implementations may pass through (`next.run(ctx).await`), short-circuit by
/// returning a response without calling `next`, or decorate the downstream
/// response.
pub trait Middleware: Send + Sync {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>>;
}

/// Cursor into the remaining middleware chain for one request.
///
/// Consumed by [`Next::run`], so each middleware can call down at most once.
pub struct Next {
    middlewares: Arc<[MiddlewareHandler]>,
    endpoint: Handler,
    index: usize,
}

impl Next {
    /// Invokes the next middleware, or the endpoint once the stack is exhausted.
    pub async fn run(mut self, ctx: Context) -> Response {
        match self.middlewares.get(self.index).cloned() {
            Some(handler) => {
                self.index += 1;
                handler(ctx, self).await
            }
            None => (self.endpoint)(ctx).await,
        }
    }
}

/// An ordered middleware stack in front of an endpoint.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use qr_catalog::{Router, Response, StatusCode};
/// use qr_catalog::middleware::{LoggerMiddleware, Pipeline};
///
/// let mut router = Router::new();
/// router.get("/", |_ctx| async { Response::new(StatusCode::Ok) });
///
/// let pipeline = Pipeline::new(router).with(LoggerMiddleware);
/// ```
#[derive(Clone)]
pub struct Pipeline {
    middlewares: Arc<[MiddlewareHandler]>,
    endpoint: Handler,
}

impl Pipeline {
    /// Creates a pipeline that routes every request through `router`.
    pub fn new(router: crate::Router) -> Self {
        let router = Arc::new(router);
        Self::from_endpoint(move |ctx: Context| {
            let router = Arc::clone(&router);
            async move { router.route(ctx.into_request()).await }
        })
    }

    /// Creates a pipeline around an arbitrary endpoint.
    pub fn from_endpoint(endpoint: impl IntoHandler) -> Self {
        Self {
            middlewares: Arc::from(Vec::new()),
            endpoint: Arc::new(move |ctx| endpoint.call(ctx)),
        }
    }

    /// Appends a middleware; earlier ones run first.
    #[must_use]
    pub fn with<M>(self, middleware: M) -> Self
    where
        M: Middleware + 'static,
    {
        let mut middlewares = self.middlewares.to_vec();
        middlewares.push(from_middleware(Arc::new(middleware)));
        Self {
            middlewares: middlewares.into(),
            endpoint: self.endpoint,
        }
    }

    /// Runs `request` through the stack.
    pub async fn handle(&self, request: Request) -> Response {
        let next = Next {
            middlewares: Arc::clone(&self.middlewares),
            endpoint: Arc::clone(&self.endpoint),
            index: 0,
        };
        next.run(Context::new(request)).await
    }
}

/// Logs every request at `info` with its method, path, query, status and duration.
pub struct LoggerMiddleware;

impl Middleware for LoggerMiddleware {
    fn handle(&self, ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        Box::pin(async move {
            let start = Instant::now();
            let method = ctx.request().method().to_string();
            let path = ctx.request().path().to_owned();
            let query = ctx.request().query_string().map(str::to_owned);
            let version = ctx.request().version();

            let response = next.run(ctx).await;

            info!(
                method = %method,
                path = %path,
                query = query.as_deref().unwrap_or(""),
                http_version = %format_args!("1.{version}"),
                status = response.status().as_u16(),
                elapsed = ?start.elapsed(),
                "request handled"
            );
            response
        })
    }
}
