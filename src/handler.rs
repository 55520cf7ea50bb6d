//! Handler capability.
//!
//! Middleware and route handlers share one capability: take the request
//! context, eventually produce a [`Reply`] or raise a [`HandlerError`].
//! Synchronous closures are wrapped with [`from_fn`], asynchronous ones with
//! [`from_async`]; both resolve to the same [`HandlerFuture`], so the pipeline
//! never needs to know which kind it is running.
//!
//! ```rust
//! use relayroute::handler::{from_async, from_fn};
//! use relayroute::{HandlerError, Reply};
//!
//! let hello = from_fn("hello", |_ctx| Ok::<_, HandlerError>("hello"));
//! let user = from_async("user", |ctx| async move {
//!     let id = ctx.param("id").unwrap_or("0").to_string();
//!     Ok::<_, HandlerError>(serde_json::json!({ "id": id }))
//! });
//! # let _ = (hello, user);
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};

use crate::error::HandlerError;
use crate::outcome::Reply;
use crate::request::RequestContext;

/// Resolved result of a single handler invocation.
pub type HandlerResult = Result<Reply, HandlerError>;

/// Boxed future every handler resolves through.
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

/// A middleware or route handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Handler backed by a synchronous closure.
pub struct FnHandler<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, R> Handler for FnHandler<F>
where
    F: Fn(&RequestContext) -> Result<R, HandlerError> + Send + Sync + 'static,
    R: Into<Reply>,
{
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture {
        future::ready((self.f)(&ctx).map(Into::into)).boxed()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap a synchronous closure.
pub fn from_fn<F, R>(name: impl Into<Cow<'static, str>>, f: F) -> FnHandler<F>
where
    F: Fn(&RequestContext) -> Result<R, HandlerError> + Send + Sync + 'static,
    R: Into<Reply>,
{
    FnHandler {
        name: name.into(),
        f,
    }
}

/// Handler backed by an asynchronous closure.
pub struct AsyncFnHandler<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut, R> Handler for AsyncFnHandler<F>
where
    F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    R: Into<Reply>,
{
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture {
        (self.f)(ctx).map(|result| result.map(Into::into)).boxed()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Wrap an asynchronous closure.
pub fn from_async<F, Fut, R>(name: impl Into<Cow<'static, str>>, f: F) -> AsyncFnHandler<F>
where
    F: Fn(Arc<RequestContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, HandlerError>> + Send + 'static,
    R: Into<Reply>,
{
    AsyncFnHandler {
        name: name.into(),
        f,
    }
}

/// Ordered handler sequence bound to one route.
#[derive(Clone, Default)]
pub struct HandlerChain {
    handlers: Vec<Arc<dyn Handler>>,
}

impl HandlerChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler (builder style).
    #[must_use]
    pub fn then(mut self, handler: impl Handler) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn push(&mut self, handler: Arc<dyn Handler>) {
        self.handlers.push(handler);
    }

    #[must_use]
    pub fn handlers(&self) -> &[Arc<dyn Handler>] {
        &self.handlers
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<H: Handler> From<H> for HandlerChain {
    fn from(handler: H) -> Self {
        Self {
            handlers: vec![Arc::new(handler)],
        }
    }
}

impl From<Vec<Arc<dyn Handler>>> for HandlerChain {
    fn from(handlers: Vec<Arc<dyn Handler>>) -> Self {
        Self { handlers }
    }
}

impl FromIterator<Arc<dyn Handler>> for HandlerChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Handler>>>(iter: I) -> Self {
        Self {
            handlers: iter.into_iter().collect(),
        }
    }
}

impl std::fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| h.name()))
            .finish()
    }
}
