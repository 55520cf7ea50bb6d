//! Error types.
//!
//! Two families live here:
//!
//! - [`HandlerError`] is what middleware and route handlers raise. It is either
//!   *HTTP-intentional* (a status code plus a payload meant for the caller) or
//!   *unclassified* (anything else). Handlers can use `?` on any error that
//!   converts into [`anyhow::Error`]; those become unclassified.
//! - [`PipelineError`] reports registration-time problems (bad status codes,
//!   malformed path patterns, unresolvable controller actions).

use std::fmt;

use http::{Method, StatusCode};

use crate::response::Body;

/// Error raised by a middleware or route handler.
#[derive(Debug)]
pub enum HandlerError {
    /// Surfaced verbatim to the caller with its status and payload.
    Http { status: StatusCode, payload: Body },
    /// Any other failure. Translated into the 500 fallback response.
    Unclassified(anyhow::Error),
}

impl HandlerError {
    /// Build an HTTP-intentional error.
    ///
    /// A code outside the range accepted by [`StatusCode::from_u16`] is
    /// replaced with `500 Internal Server Error`.
    pub fn http(status: u16, payload: impl Into<Body>) -> Self {
        let status = StatusCode::from_u16(status).unwrap_or_else(|_| {
            tracing::warn!(status, "Invalid status on HTTP error, using 500");
            StatusCode::INTERNAL_SERVER_ERROR
        });
        HandlerError::Http {
            status,
            payload: payload.into(),
        }
    }

    pub fn bad_request(payload: impl Into<Body>) -> Self {
        Self::http(400, payload)
    }

    pub fn unauthorized(payload: impl Into<Body>) -> Self {
        Self::http(401, payload)
    }

    pub fn forbidden(payload: impl Into<Body>) -> Self {
        Self::http(403, payload)
    }

    pub fn not_found(payload: impl Into<Body>) -> Self {
        Self::http(404, payload)
    }

    /// Wrap an arbitrary message as an unclassified error.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        HandlerError::Unclassified(anyhow::Error::msg(message))
    }

    /// The status this error will be answered with.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            HandlerError::Http { status, .. } => *status,
            HandlerError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn is_http(&self) -> bool {
        matches!(self, HandlerError::Http { .. })
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::Http { status, payload } => match payload {
                Body::Text(text) => write!(f, "HTTP {}: {}", status.as_u16(), text),
                Body::Json(value) => write!(f, "HTTP {}: {}", status.as_u16(), value),
                Body::Empty => write!(f, "HTTP {}", status.as_u16()),
            },
            HandlerError::Unclassified(err) => write!(f, "{err}"),
        }
    }
}

impl<E> From<E> for HandlerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        HandlerError::Unclassified(err.into())
    }
}

/// Registration-time error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Status code outside the valid HTTP range.
    InvalidStatus(u16),
    /// A path pattern could not be compiled.
    InvalidPattern { pattern: String, reason: String },
    /// A controller description names an action the controller does not expose.
    UnknownAction { controller: String, action: String },
    /// A route was registered without any handler.
    EmptyChain { method: Method, pattern: String },
    /// A controller description uses a method name that is not an HTTP method.
    UnsupportedMethod(String),
    /// A controller description document could not be parsed.
    Description(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InvalidStatus(code) => {
                write!(f, "invalid HTTP status code {code}")
            }
            PipelineError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid path pattern '{pattern}': {reason}")
            }
            PipelineError::UnknownAction { controller, action } => {
                write!(
                    f,
                    "controller '{controller}' does not expose an action named '{action}'"
                )
            }
            PipelineError::EmptyChain { method, pattern } => {
                write!(f, "route {method} {pattern} has no handlers")
            }
            PipelineError::UnsupportedMethod(method) => {
                write!(f, "unsupported HTTP method '{method}'")
            }
            PipelineError::Description(reason) => {
                write!(f, "malformed controller description: {reason}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}
