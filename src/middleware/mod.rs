//! Built-in middleware.
//!
//! Middleware is any [`Handler`](crate::handler::Handler) registered with
//! [`Pipeline::register_middleware`](crate::Pipeline::register_middleware);
//! these are the ones shipped with the crate.

mod auth;
mod cors;
mod request_log;

pub use auth::TokenAuth;
pub use cors::CorsPreflight;
pub use request_log::RequestLog;
