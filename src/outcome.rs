//! Outcome Normalizer.
//!
//! Handlers return a [`Reply`] (or raise a [`HandlerError`]). Before the
//! pipeline acts on it, every result is classified into a closed
//! [`Outcome`]:
//!
//! | handler result                 | outcome                                   |
//! |--------------------------------|-------------------------------------------|
//! | `Reply::Nothing`               | `Continue`                                |
//! | `Reply::Response(r)`           | `Respond(r)` verbatim                     |
//! | `Reply::Json(v)`               | `Respond` 200, `application/json`, `v`    |
//! | `Reply::Text(s)`               | `Respond` 200, text content type, `s`     |
//! | `Err(e)` / panic while resolving | `Fail(e)`                               |
//!
//! Classification depends only on the resolved value, never on whether it was
//! produced synchronously or after suspension.

use std::any::Any;

use http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::HandlerError;
use crate::response::{Body, Response};

/// The shapes a handler may return.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reply {
    /// No answer: hand control to the next step.
    #[default]
    Nothing,
    Text(String),
    Json(Value),
    Response(Response),
}

impl Reply {
    /// Serialize any value into a structured reply.
    pub fn json_of<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        Ok(Reply::Json(serde_json::to_value(value)?))
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Nothing
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

/// JSON strings are text; everything else is structured.
impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Reply::Text(text),
            other => Reply::Json(other),
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Response(response)
    }
}

impl<T: Into<Reply>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Reply::Nothing, Into::into)
    }
}

/// Classified result of one middleware or handler step.
#[derive(Debug)]
pub enum Outcome {
    Continue,
    Respond(Response),
    Fail(HandlerError),
}

impl Outcome {
    #[must_use]
    pub fn is_continue(&self) -> bool {
        matches!(self, Outcome::Continue)
    }

    /// Short label used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Continue => "continue",
            Outcome::Respond(_) => "respond",
            Outcome::Fail(_) => "error",
        }
    }
}

/// Classify a resolved handler result.
#[must_use]
pub fn normalize(result: Result<Reply, HandlerError>) -> Outcome {
    match result {
        Ok(Reply::Nothing) => Outcome::Continue,
        Ok(Reply::Response(response)) => Outcome::Respond(response),
        Ok(Reply::Json(value)) => {
            Outcome::Respond(Response::with_body(StatusCode::OK, Body::Json(value)))
        }
        Ok(Reply::Text(text)) => {
            Outcome::Respond(Response::with_body(StatusCode::OK, Body::Text(text)))
        }
        Err(err) => Outcome::Fail(err),
    }
}

/// Classify a result whose resolution may itself have failed (panicked).
///
/// A failed resolution is treated exactly like a raised error.
#[must_use]
pub fn normalize_resolution(
    resolution: Result<Result<Reply, HandlerError>, Box<dyn Any + Send>>,
) -> Outcome {
    match resolution {
        Ok(result) => normalize(result),
        Err(panic) => Outcome::Fail(HandlerError::msg(panic_message(panic.as_ref()))),
    }
}

/// Best-effort text of a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Translate a raised error into the response the caller receives.
///
/// HTTP-intentional errors keep their status and payload. Anything else
/// becomes a 500 whose body carries the error message when
/// `expose_message` is set; no other detail leaves the process.
#[must_use]
pub fn error_response(err: HandlerError, expose_message: bool) -> Response {
    match err {
        HandlerError::Http { status, payload } => Response::with_body(status, payload),
        HandlerError::Unclassified(err) => {
            let body = if expose_message {
                format!("Error 500. <br /><br />Message: {err}.")
            } else {
                "Error 500.".to_string()
            };
            Response::with_body(StatusCode::INTERNAL_SERVER_ERROR, Body::Text(body))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{JSON_CONTENT_TYPE, TEXT_CONTENT_TYPE};
    use serde_json::json;

    #[test]
    fn test_nothing_continues() {
        assert!(normalize(Ok(Reply::Nothing)).is_continue());
        assert!(normalize(Ok(Reply::from(None::<String>))).is_continue());
        assert!(normalize(Ok(().into())).is_continue());
    }

    #[test]
    fn test_text_is_wrapped_with_text_content_type() {
        let Outcome::Respond(res) = normalize(Ok("hello".into())) else {
            panic!("expected respond");
        };
        assert_eq!(res.status(), 200);
        assert_eq!(res.header("content-type"), Some(TEXT_CONTENT_TYPE));
        assert_eq!(res.body(), &Body::Text("hello".into()));
    }

    #[test]
    fn test_structured_is_wrapped_as_json() {
        let Outcome::Respond(res) = normalize(Ok(json!({"a": 1}).into())) else {
            panic!("expected respond");
        };
        assert_eq!(res.status(), 200);
        assert_eq!(res.header("content-type"), Some(JSON_CONTENT_TYPE));
        assert_eq!(res.body().to_bytes(), br#"{"a":1}"#.to_vec());
    }

    #[test]
    fn test_json_string_counts_as_text() {
        assert_eq!(Reply::from(json!("plain")), Reply::Text("plain".into()));
    }

    #[test]
    fn test_response_passes_through_verbatim() {
        let built = Response::builder()
            .status(202)
            .header("x-custom", "1")
            .text("queued")
            .build()
            .unwrap();
        let Outcome::Respond(res) = normalize(Ok(built.clone().into())) else {
            panic!("expected respond");
        };
        assert_eq!(res, built);
    }

    #[test]
    fn test_error_and_panic_both_fail() {
        assert_eq!(normalize(Err(HandlerError::msg("boom"))).kind(), "error");
        let panic: Box<dyn Any + Send> = Box::new("kaboom");
        let Outcome::Fail(err) = normalize_resolution(Err(panic)) else {
            panic!("expected fail");
        };
        assert_eq!(err.to_string(), "kaboom");
    }

    #[test]
    fn test_http_error_response_keeps_payload() {
        let res = error_response(HandlerError::not_found(json!({"error": "not found"})), true);
        assert_eq!(res.status(), 404);
        assert_eq!(res.body().to_bytes(), br#"{"error":"not found"}"#.to_vec());

        let res = error_response(HandlerError::forbidden("nope"), true);
        assert_eq!(res.status(), 403);
        assert_eq!(res.body(), &Body::Text("nope".into()));
    }

    #[test]
    fn test_unclassified_error_response() {
        let res = error_response(HandlerError::msg("boom"), true);
        assert_eq!(res.status(), 500);
        let Body::Text(text) = res.body() else {
            panic!("expected text body");
        };
        assert!(text.contains("boom"));

        let hidden = error_response(HandlerError::msg("secret"), false);
        assert_eq!(hidden.body(), &Body::Text("Error 500.".into()));
    }
}
