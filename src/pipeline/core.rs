//! Dispatch pipeline core - per-request chain execution.
//!
//! Each request resolves to exactly one [`Resolution`]: still open (nobody
//! answered), answered with a response, or aborted by the client. The
//! resolution is threaded through the chain by value, and [`finish`] turns it
//! into a single terminal action. Pass-through is an `FnOnce` consumed in one
//! match arm and the response is moved into the sink in another, so the two
//! actions are mutually exclusive and each can fire at most once.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use http::Method;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::stats::{PipelineStats, StatsSnapshot};
use crate::config::PipelineConfig;
use crate::controller::{self, Controller, RouteDescription};
use crate::error::PipelineError;
use crate::handler::{Handler, HandlerChain};
use crate::outcome::{error_response, normalize_resolution, Outcome};
use crate::request::{RawRequest, RequestContext};
use crate::response::Response;
use crate::router::{ParamVec, PathPattern, RouteTable};
use crate::sink::{write_response, ResponseSink};

/// Terminal action taken for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// A response was written to the sink.
    Responded { status: u16 },
    /// No step answered; pass-through was invoked.
    PassedThrough,
    /// The sink closed before a response could be written; nothing fired.
    Aborted,
}

/// Per-request state after running the chain.
#[derive(Debug)]
pub(crate) enum Resolution {
    Open,
    Answered { response: Response, failed: bool },
    Aborted,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Middleware,
    Route,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Middleware => "middleware",
            Phase::Route => "route",
        }
    }
}

/// Ordered middleware plus a route table, executed per request.
///
/// Build it at startup, then share it (for example behind an `Arc`) between
/// concurrent requests; `handle` only needs `&self`.
pub struct Pipeline {
    config: PipelineConfig,
    middlewares: Vec<Arc<dyn Handler>>,
    routes: RouteTable,
    stats: PipelineStats,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::with_config(PipelineConfig::default())
    }
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            config,
            middlewares: Vec::new(),
            routes: RouteTable::new(config.trailing_slash),
            stats: PipelineStats::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Append a middleware. Middleware runs for every request, in
    /// registration order, before route dispatch.
    pub fn register_middleware(&mut self, middleware: impl Handler) -> &mut Self {
        self.register_middleware_arc(Arc::new(middleware))
    }

    pub fn register_middleware_arc(&mut self, middleware: Arc<dyn Handler>) -> &mut Self {
        debug!(
            middleware = middleware.name(),
            position = self.middlewares.len(),
            "Middleware registered"
        );
        self.middlewares.push(middleware);
        self
    }

    /// Add a route, or replace the chain of an existing one.
    pub fn register_route(
        &mut self,
        method: Method,
        pattern: &str,
        chain: impl Into<HandlerChain>,
    ) -> Result<&mut Self, PipelineError> {
        self.routes.insert(method, pattern, chain.into())?;
        Ok(self)
    }

    pub fn get(
        &mut self,
        pattern: &str,
        chain: impl Into<HandlerChain>,
    ) -> Result<&mut Self, PipelineError> {
        self.register_route(Method::GET, pattern, chain)
    }

    pub fn post(
        &mut self,
        pattern: &str,
        chain: impl Into<HandlerChain>,
    ) -> Result<&mut Self, PipelineError> {
        self.register_route(Method::POST, pattern, chain)
    }

    pub fn put(
        &mut self,
        pattern: &str,
        chain: impl Into<HandlerChain>,
    ) -> Result<&mut Self, PipelineError> {
        self.register_route(Method::PUT, pattern, chain)
    }

    pub fn patch(
        &mut self,
        pattern: &str,
        chain: impl Into<HandlerChain>,
    ) -> Result<&mut Self, PipelineError> {
        self.register_route(Method::PATCH, pattern, chain)
    }

    pub fn delete(
        &mut self,
        pattern: &str,
        chain: impl Into<HandlerChain>,
    ) -> Result<&mut Self, PipelineError> {
        self.register_route(Method::DELETE, pattern, chain)
    }

    /// Bind a controller using its own route description.
    ///
    /// Returns the number of routes registered.
    pub fn bind_controller<C: Controller>(
        &mut self,
        controller: Arc<C>,
    ) -> Result<usize, PipelineError> {
        let description = controller.routes();
        self.bind_controller_with(&description, controller)
    }

    /// Bind a controller against an explicit route description.
    ///
    /// Action names missing from the controller's action table are dropped
    /// (or rejected when `strict_binding` is set). A route left with no
    /// resolvable actions is not registered. On error nothing is registered.
    pub fn bind_controller_with<C: Controller>(
        &mut self,
        description: &RouteDescription,
        controller: Arc<C>,
    ) -> Result<usize, PipelineError> {
        let table = C::actions();
        let bound = controller::bind(
            description,
            &table,
            &controller,
            self.config.strict_binding,
        )?;
        // reject the whole description before any route is registered
        for route in &bound {
            PathPattern::compile(&route.path, self.config.trailing_slash)?;
        }
        let count = bound.len();
        for route in bound {
            self.routes.insert(route.method, &route.path, route.chain)?;
        }
        info!(
            controller = controller.name(),
            routes = count,
            "Controller bound"
        );
        Ok(count)
    }

    /// Run one request through middleware and the matched route chain.
    ///
    /// Exactly one of these happens: a response is written to `sink`, or
    /// `pass_through` is invoked (once). If the sink reports closed, neither
    /// happens and [`Disposition::Aborted`] is returned.
    pub async fn handle<S, P>(&self, raw: RawRequest, sink: &mut S, pass_through: P) -> Disposition
    where
        S: ResponseSink + ?Sized,
        P: FnOnce(),
    {
        let path = raw.path.clone();
        let resolution = self.resolve(raw, &path, &*sink).await;
        finish(resolution, sink, pass_through)
    }

    /// Run the chains for `raw`, routing on `path`, without writing anything.
    pub(crate) async fn resolve<S>(&self, raw: RawRequest, path: &str, sink: &S) -> Resolution
    where
        S: ResponseSink + ?Sized,
    {
        self.stats.record_request();
        let started = Instant::now();

        let matched = self.routes.route(&raw.method, path);
        let (route, params) = match &matched {
            Some(m) => (
                Some(Arc::clone(m.entry.pattern().raw())),
                m.path_params.clone(),
            ),
            None => (None, ParamVec::new()),
        };
        let ctx = Arc::new(RequestContext::new(raw, path, route, params));

        let span = info_span!(
            "request",
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            route = ctx.route_pattern().unwrap_or("<none>"),
        );

        let resolution = async {
            let resolution = self
                .run_chain(Phase::Middleware, &self.middlewares, &ctx, sink)
                .await;
            match (resolution, &matched) {
                (Resolution::Open, Some(m)) => {
                    self.run_chain(Phase::Route, m.entry.handlers(), &ctx, sink)
                        .await
                }
                (resolution, _) => resolution,
            }
        }
        .instrument(span.clone())
        .await;

        // a closed sink gets neither a response nor a pass-through
        let resolution = match resolution {
            Resolution::Open | Resolution::Answered { .. } if !sink.is_open() => {
                Resolution::Aborted
            }
            other => other,
        };

        let _entered = span.enter();
        let latency_us = started.elapsed().as_micros() as u64;
        match &resolution {
            Resolution::Open => {
                self.stats.record_passed_through();
                debug!(latency_us, matched = matched.is_some(), "No step answered; passing through");
            }
            Resolution::Answered { response, failed } => {
                self.stats.record_responded(*failed);
                info!(status = response.status(), failed, latency_us, "Request answered");
            }
            Resolution::Aborted => {
                self.stats.record_aborted();
                warn!(latency_us, "Request aborted by client");
            }
        }
        resolution
    }

    /// Run `chain` strictly in order until a step answers.
    async fn run_chain<S>(
        &self,
        phase: Phase,
        chain: &[Arc<dyn Handler>],
        ctx: &Arc<RequestContext>,
        sink: &S,
    ) -> Resolution
    where
        S: ResponseSink + ?Sized,
    {
        for (idx, handler) in chain.iter().enumerate() {
            if !sink.is_open() {
                warn!(
                    phase = phase.as_str(),
                    handler_idx = idx,
                    "Sink closed; chain stopped"
                );
                return Resolution::Aborted;
            }

            let started = Instant::now();
            let outcome = invoke(handler, ctx).await;
            debug!(
                phase = phase.as_str(),
                handler_idx = idx,
                handler = handler.name(),
                outcome = outcome.kind(),
                latency_us = started.elapsed().as_micros() as u64,
                "Step complete"
            );

            match outcome {
                Outcome::Continue => {}
                Outcome::Respond(response) => {
                    return Resolution::Answered {
                        response,
                        failed: false,
                    };
                }
                Outcome::Fail(err) => {
                    if err.is_http() {
                        info!(
                            phase = phase.as_str(),
                            handler = handler.name(),
                            status = err.status().as_u16(),
                            "Handler raised HTTP error"
                        );
                    } else {
                        error!(
                            phase = phase.as_str(),
                            handler = handler.name(),
                            error = %err,
                            "Handler failed"
                        );
                    }
                    return Resolution::Answered {
                        response: error_response(err, self.config.expose_error_message),
                        failed: true,
                    };
                }
            }
        }
        Resolution::Open
    }
}

/// Invoke one handler and classify its result.
///
/// Panics raised while creating or polling the handler future are caught
/// and classified as errors.
async fn invoke(handler: &Arc<dyn Handler>, ctx: &Arc<RequestContext>) -> Outcome {
    let call = std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(Arc::clone(ctx))));
    let resolution = match call {
        Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
        Err(panic) => Err(panic),
    };
    normalize_resolution(resolution)
}

/// Apply the single terminal action for a resolution.
pub(crate) fn finish<S, P>(resolution: Resolution, sink: &mut S, pass_through: P) -> Disposition
where
    S: ResponseSink + ?Sized,
    P: FnOnce(),
{
    match resolution {
        Resolution::Open => {
            pass_through();
            Disposition::PassedThrough
        }
        Resolution::Answered { response, .. } => {
            if !sink.is_open() {
                return Disposition::Aborted;
            }
            let status = response.status();
            write_response(sink, response);
            Disposition::Responded { status }
        }
        Resolution::Aborted => Disposition::Aborted,
    }
}
