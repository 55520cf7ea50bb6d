use std::sync::Arc;

use futures::future::{self, FutureExt};
use http::{Method, StatusCode};
use tracing::{debug, warn};

use crate::error::HandlerError;
use crate::handler::{Handler, HandlerFuture};
use crate::outcome::Reply;
use crate::request::RequestContext;
use crate::response::Response;

/// Answers CORS preflight requests.
///
/// Only `OPTIONS` requests carrying `access-control-request-method` are
/// treated as preflight; everything else continues down the chain. A valid
/// preflight is answered with `204` and the allow headers, an invalid one
/// (origin, method or headers not allowed) with `403`.
#[derive(Debug, Clone)]
pub struct CorsPreflight {
    allowed_origins: Vec<String>,
    allowed_methods: Vec<Method>,
    allowed_headers: Vec<String>,
    max_age: Option<u32>,
}

impl Default for CorsPreflight {
    /// Any origin, common methods, `Content-Type` and `Authorization`.
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".to_string()],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ],
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            max_age: None,
        }
    }
}

impl CorsPreflight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_origins = origins.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.allowed_methods = methods.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_headers = headers.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, seconds: u32) -> Self {
        self.max_age = Some(seconds);
        self
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|o| o == "*" || o == origin)
    }

    fn headers_allowed(&self, requested: &str) -> bool {
        if self.allowed_headers.iter().any(|h| h == "*") {
            return true;
        }
        requested
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .all(|h| self.allowed_headers.iter().any(|a| a.eq_ignore_ascii_case(h)))
    }

    fn preflight(&self, ctx: &RequestContext) -> Result<Reply, HandlerError> {
        if *ctx.method() != Method::OPTIONS {
            return Ok(Reply::Nothing);
        }
        let Some(requested_method) = ctx.header("access-control-request-method") else {
            return Ok(Reply::Nothing);
        };

        let origin = ctx.header("origin");
        if let Some(origin) = origin {
            if !self.origin_allowed(origin) {
                warn!(origin = %origin, path = %ctx.path(), "CORS preflight: origin not allowed");
                return Ok(forbidden());
            }
        }

        let method_ok = requested_method
            .trim()
            .parse::<Method>()
            .map(|m| self.allowed_methods.contains(&m))
            .unwrap_or(false);
        if !method_ok {
            warn!(method = %requested_method, "CORS preflight: method not allowed");
            return Ok(forbidden());
        }

        if let Some(requested) = ctx.header("access-control-request-headers") {
            if !self.headers_allowed(requested) {
                warn!(headers = %requested, "CORS preflight: headers not allowed");
                return Ok(forbidden());
            }
        }

        let allow_origin = match origin {
            Some(o) if !self.allowed_origins.iter().any(|a| a == "*") => o,
            _ => "*",
        };
        let methods = self
            .allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");

        let mut builder = Response::builder()
            .status(StatusCode::NO_CONTENT.as_u16())
            .header("access-control-allow-origin", allow_origin)
            .header("access-control-allow-methods", methods)
            .header("access-control-allow-headers", self.allowed_headers.join(", "))
            .header("vary", "Origin");
        if let Some(age) = self.max_age {
            builder = builder.header("access-control-max-age", age.to_string());
        }
        debug!(path = %ctx.path(), method = %requested_method, "CORS preflight answered");
        Ok(Reply::Response(builder.build()?))
    }
}

fn forbidden() -> Reply {
    Reply::Response(Response::error(StatusCode::FORBIDDEN, "Forbidden"))
}

impl Handler for CorsPreflight {
    fn call(&self, ctx: Arc<RequestContext>) -> HandlerFuture {
        future::ready(self.preflight(&ctx)).boxed()
    }

    fn name(&self) -> &str {
        "cors_preflight"
    }
}
