//! # relayroute
//!
//! **relayroute** is a request-dispatch pipeline for HTTP services: ordered
//! middleware, per-route handler chains, and a normalizer that turns every
//! handler's result into exactly one terminal action per request.
//!
//! ## Overview
//!
//! A transport (any HTTP server) hands the pipeline a [`RawRequest`], a
//! [`ResponseSink`] to write to, and a pass-through action to call when no
//! handler answers. The pipeline matches the route, runs middleware in
//! registration order, then the matched route's chain, and guarantees that
//! either the sink receives one response or pass-through is called once.
//!
//! ## Architecture
//!
//! - **[`handler`]** - The [`Handler`] capability shared by middleware and routes
//! - **[`outcome`]** - Handler return shapes ([`Reply`]) and their normalization
//! - **[`error`]** - [`HandlerError`] (HTTP-intentional or unclassified) and [`PipelineError`]
//! - **[`response`]** - The [`Response`] model and builder
//! - **[`request`]** - [`RawRequest`] and the per-request [`RequestContext`]
//! - **[`router`]** - Path patterns and the ordered route table
//! - **[`pipeline`]** - The dispatch core ([`Pipeline`])
//! - **[`controller`]** - Binding controllers from declarative route descriptions
//! - **[`mount`]** - Several pipelines mounted under path prefixes ([`App`])
//! - **[`sink`]** - Transport sinks ([`HttpResponseSink`], [`RecordingSink`])
//! - **[`middleware`]** - Built-in middleware
//! - **[`config`]** / **[`logging`]** - Environment-driven configuration and tracing setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Transport
//!     participant Pipeline
//!     participant Router as RouteTable
//!     participant MW as Middleware
//!     participant Chain as Route Chain
//!     participant Sink
//!
//!     Transport->>Pipeline: handle(raw, sink, pass_through)
//!     Pipeline->>Router: route(method, path)
//!     Router-->>Pipeline: RouteMatch (params) or none
//!     loop each middleware, in order
//!         Pipeline->>MW: call(ctx)
//!         MW-->>Pipeline: continue / respond / error
//!     end
//!     alt still open and route matched
//!         loop each handler, in order
//!             Pipeline->>Chain: call(ctx)
//!             Chain-->>Pipeline: continue / respond / error
//!         end
//!     end
//!     alt answered
//!         Pipeline->>Sink: set_headers, set_status, send
//!     else nobody answered
//!         Pipeline->>Transport: pass_through()
//!     end
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use relayroute::handler::{from_async, from_fn};
//! use relayroute::middleware::RequestLog;
//! use relayroute::{HandlerError, HttpResponseSink, Pipeline, RawRequest};
//! use http::Method;
//!
//! # futures::executor::block_on(async {
//! let mut pipeline = Pipeline::new();
//! pipeline.register_middleware(RequestLog);
//! pipeline
//!     .get("/pets/:id", from_async("get_pet", |ctx| async move {
//!         let id = ctx.param("id").unwrap_or_default().to_string();
//!         Ok::<_, HandlerError>(serde_json::json!({ "id": id, "name": "Rex" }))
//!     }))
//!     .unwrap()
//!     .get("/missing", from_fn("missing", |_ctx| {
//!         Err::<(), _>(HandlerError::not_found("no such thing"))
//!     }))
//!     .unwrap();
//!
//! let mut sink = HttpResponseSink::new();
//! pipeline
//!     .handle(RawRequest::new(Method::GET, "/pets/7"), &mut sink, || {})
//!     .await;
//! let response = sink.into_response().unwrap();
//! assert_eq!(response.status(), 200);
//! # });
//! ```
//!
//! ## Handler Results
//!
//! | Handler returns | Outcome |
//! |-----------------|---------|
//! | `Ok(())` / `Ok(None)` | continue to the next step |
//! | `Ok(text)` | `200`, `text/html` body |
//! | `Ok(json)` | `200`, `application/json` body |
//! | `Ok(Response)` | that response, as built |
//! | `Err(HandlerError::Http { .. })` | that status and payload |
//! | `Err(other)` or a panic | `500` fallback |
//!
//! ## Runtime Considerations
//!
//! The pipeline is runtime-agnostic: handlers return boxed futures and the
//! pipeline only awaits them. Drive [`Pipeline::handle`] from tokio, another
//! executor, or `futures::executor::block_on`.

pub mod config;
pub mod controller;
pub mod error;
pub mod handler;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod mount;
pub mod outcome;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod router;
pub mod sink;

pub use config::PipelineConfig;
pub use controller::{ActionTable, Controller, RouteDescription};
pub use error::{HandlerError, PipelineError};
pub use handler::{from_async, from_fn, Handler, HandlerChain};
pub use ids::RequestId;
pub use mount::App;
pub use outcome::{Outcome, Reply};
pub use pipeline::{Disposition, Pipeline, StatsSnapshot};
pub use request::{RawRequest, RequestContext};
pub use response::{Body, Response};
pub use sink::{HttpResponseSink, RecordingSink, ResponseSink};
