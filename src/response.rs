//! Response Model.
//!
//! A [`Response`] is immutable once built. Handler code assembles one through
//! [`ResponseBuilder`] (or the shortcut constructors), and the pipeline consumes
//! it exactly once when writing to the transport sink.

use std::sync::Arc;

use http::StatusCode;
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::PipelineError;

/// Maximum inline headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated header storage.
///
/// Header names use `Arc<str>` so the common static names clone in O(1).
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Content type used for text bodies.
pub const TEXT_CONTENT_TYPE: &str = "text/html; charset=utf-8";
/// Content type used for structured bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Response payload: raw text or a structured value destined for serialization.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Json(Value),
}

impl Body {
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, Body::Json(_))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    /// Content type a transport should apply when the response sets none.
    #[must_use]
    pub fn default_content_type(&self) -> Option<&'static str> {
        match self {
            Body::Empty => None,
            Body::Text(_) => Some(TEXT_CONTENT_TYPE),
            Body::Json(_) => Some(JSON_CONTENT_TYPE),
        }
    }

    /// Serialize the body for the wire.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Body::Empty => Vec::new(),
            Body::Text(text) => text.clone().into_bytes(),
            Body::Json(value) => value.to_string().into_bytes(),
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Body::Text(text.to_string())
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}

/// Finalized response description: status, headers and body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: HeaderVec,
    body: Body,
}

impl Response {
    /// Start building a response (status defaults to 200).
    #[must_use]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// `200 OK` with a text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::with_body(StatusCode::OK, Body::Text(body.into()))
    }

    /// `200 OK` with a structured body.
    #[must_use]
    pub fn json(body: Value) -> Self {
        Self::with_body(StatusCode::OK, Body::Json(body))
    }

    /// Structured `{ "error": message }` body with the given status.
    #[must_use]
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::with_body(status, Body::Json(serde_json::json!({ "error": message })))
    }

    /// Response with an explicit content type derived from the body.
    pub(crate) fn with_body(status: StatusCode, body: Body) -> Self {
        let mut headers = HeaderVec::new();
        if let Some(content_type) = body.default_content_type() {
            headers.push((Arc::from("content-type"), content_type.to_string()));
        }
        Self {
            status,
            headers,
            body,
        }
    }

    #[inline]
    #[must_use]
    pub fn status(&self) -> u16 {
        self.status.as_u16()
    }

    #[inline]
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Consume the response, yielding what the sink writes.
    ///
    /// A `content-type` is added from the body kind when the response did
    /// not set one.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderVec, Body) {
        let mut headers = self.headers;
        let has_content_type = headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
        if !has_content_type {
            if let Some(content_type) = self.body.default_content_type() {
                headers.push((Arc::from("content-type"), content_type.to_string()));
            }
        }
        (self.status, headers, self.body)
    }
}

/// Builder for [`Response`]; mutators exist only during construction.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    status: u16,
    headers: HeaderVec,
    body: Body,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: Body::Empty,
        }
    }
}

impl ResponseBuilder {
    #[must_use]
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Set a header. The last write for a given name (case-insensitive) wins.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    /// Set several headers at once, in iteration order.
    #[must_use]
    pub fn headers<'a, I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in headers {
            self = self.header(name, value);
        }
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn text(self, body: impl Into<String>) -> Self {
        self.body(Body::Text(body.into()))
    }

    #[must_use]
    pub fn json(self, body: Value) -> Self {
        self.body(Body::Json(body))
    }

    /// Finish construction, validating the status code.
    pub fn build(self) -> Result<Response, PipelineError> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|_| PipelineError::InvalidStatus(self.status))?;
        Ok(Response {
            status,
            headers: self.headers,
            body: self.body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults_to_200() {
        let res = Response::builder().text("hi").build().unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.body(), &Body::Text("hi".into()));
        assert!(res.header("content-type").is_none());
    }

    #[test]
    fn test_builder_last_header_write_wins() {
        let res = Response::builder()
            .header("X-Trace", "a")
            .header("x-trace", "b")
            .build()
            .unwrap();
        assert_eq!(res.headers().len(), 1);
        assert_eq!(res.header("X-TRACE"), Some("b"));
    }

    #[test]
    fn test_builder_rejects_invalid_status() {
        let err = Response::builder().status(1000).build().unwrap_err();
        assert_eq!(err, PipelineError::InvalidStatus(1000));
        assert!(Response::builder().status(99).build().is_err());
    }

    #[test]
    fn test_into_parts_fills_content_type_from_body() {
        let res = Response::builder()
            .status(201)
            .json(json!({"id": 7}))
            .build()
            .unwrap();
        let (status, headers, body) = res.into_parts();
        assert_eq!(status, StatusCode::CREATED);
        assert!(headers
            .iter()
            .any(|(k, v)| k.as_ref() == "content-type" && v == JSON_CONTENT_TYPE));
        assert_eq!(body.to_bytes(), br#"{"id":7}"#.to_vec());
    }

    #[test]
    fn test_into_parts_keeps_explicit_content_type() {
        let res = Response::builder()
            .header("Content-Type", "text/plain")
            .text("raw")
            .build()
            .unwrap();
        let (_, headers, _) = res.into_parts();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].1, "text/plain");
    }

    #[test]
    fn test_error_shortcut() {
        let res = Response::error(StatusCode::UNAUTHORIZED, "Unauthorized");
        assert_eq!(res.status(), 401);
        assert_eq!(res.body(), &Body::Json(json!({"error": "Unauthorized"})));
        assert_eq!(res.header("content-type"), Some(JSON_CONTENT_TYPE));
    }
}
