//! # Pipeline Module
//!
//! The pipeline runs one request through an ordered list of middleware and
//! then through the handler chain of the matching route.
//!
//! ## Request Flow
//!
//! 1. The route is matched first, so middleware already sees path parameters
//! 2. Middleware runs in registration order
//! 3. If no middleware answered and a route matched, its chain runs in order
//! 4. The first step that answers ends the request; later steps never run
//! 5. If nobody answered, the caller's pass-through fires instead
//!
//! Every step's result goes through [`normalize`](crate::outcome::normalize):
//! nothing means continue, a value means respond, an error means fail.
//! Raised errors become responses via
//! [`error_response`](crate::outcome::error_response).
//!
//! ## Cancellation
//!
//! Before each step the pipeline asks the sink whether the client is still
//! there. Once the sink reports closed, no further step runs, nothing is
//! written and pass-through is not called.
//!
//! ## Example
//!
//! ```rust
//! use relayroute::handler::from_fn;
//! use relayroute::{Disposition, HandlerError, Pipeline, RawRequest, RecordingSink};
//! use http::Method;
//!
//! # futures::executor::block_on(async {
//! let mut pipeline = Pipeline::new();
//! pipeline
//!     .get("/hello/:name", from_fn("hello", |ctx| {
//!         Ok::<_, HandlerError>(format!("hello {}", ctx.param("name").unwrap_or("?")))
//!     }))
//!     .unwrap();
//!
//! let mut sink = RecordingSink::new();
//! let outcome = pipeline
//!     .handle(RawRequest::new(Method::GET, "/hello/ada"), &mut sink, || {})
//!     .await;
//! assert_eq!(outcome, Disposition::Responded { status: 200 });
//! assert_eq!(sink.body_text().as_deref(), Some("hello ada"));
//! # });
//! ```

mod core;
mod stats;

pub use core::{Disposition, Pipeline};
pub(crate) use core::{finish, Resolution};
pub use stats::{PipelineStats, StatsSnapshot};
