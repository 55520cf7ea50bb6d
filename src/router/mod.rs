//! # Router Module
//!
//! The route table maps `(HTTP method, path pattern)` to an ordered handler
//! chain. It is built at startup and only read afterwards, so concurrent
//! requests can match against it without synchronization.
//!
//! ## Matching
//!
//! Routes are tested in registration order and the first match wins, so
//! registration order is the priority rule when patterns overlap:
//!
//! ```rust,ignore
//! table.insert(Method::GET, "/users/me", chain_a)?;   // wins for /users/me
//! table.insert(Method::GET, "/users/:id", chain_b)?;  // everything else
//! ```
//!
//! Re-registering the same method and pattern replaces the chain in place and
//! keeps the original position.
//!
//! A `HEAD` request with no explicit `HEAD` route falls back to the `GET`
//! route for the same path.

mod core;
mod pattern;

pub use core::{ParamVec, RouteEntry, RouteMatch, RouteTable, MAX_INLINE_PARAMS};
pub use pattern::PathPattern;
