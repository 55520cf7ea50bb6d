//! Request Context.
//!
//! [`RawRequest`] is the primitive a transport hands over: method, path,
//! already-parsed query, headers and body. The pipeline wraps it once per
//! request in a [`RequestContext`], the read-only view handlers receive.

use std::sync::Arc;

use dashmap::DashMap;
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::error::HandlerError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::response::HeaderVec;
use crate::router::ParamVec;

/// Raw transport request.
///
/// Header names are stored lower-cased.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    /// Path without query string.
    pub path: String,
    pub query: ParamVec,
    pub headers: HeaderVec,
    pub body: Option<Value>,
}

impl RawRequest {
    /// Build from a method and request target (`/path?query`).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = split_target(target);
        Self {
            method,
            path: path.to_string(),
            query: parse_query_params(query),
            headers: HeaderVec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        self.headers.retain(|(k, _)| k.as_ref() != name);
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Adapt an `http::Request`.
    ///
    /// A JSON content type (`application/json`, `*/*+json`) gets the body
    /// parsed as JSON; anything else, or JSON that fails to parse, is kept
    /// as a string. An empty body is `None`.
    pub fn from_http(req: http::Request<Vec<u8>>) -> Self {
        let (parts, bytes) = req.into_parts();
        let path = parts.uri.path().to_string();
        let query = parse_query_params(parts.uri.query().unwrap_or(""));

        let mut headers = HeaderVec::new();
        for (name, value) in &parts.headers {
            // http::HeaderName is already lower-case
            headers.push((
                Arc::from(name.as_str()),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            ));
        }

        let is_json = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(is_json_content_type);
        let body = if bytes.is_empty() {
            None
        } else if is_json {
            match serde_json::from_slice::<Value>(&bytes) {
                Ok(json) => Some(json),
                Err(_) => Some(Value::String(String::from_utf8_lossy(&bytes).into_owned())),
            }
        } else {
            Some(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        debug!(
            method = %parts.method,
            path = %path,
            header_count = headers.len(),
            query_count = query.len(),
            has_body = body.is_some(),
            "HTTP request adapted"
        );

        Self {
            method: parts.method,
            path,
            query,
            headers,
            body,
        }
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Split `target` into path and query string.
#[must_use]
pub fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (if path.is_empty() { "/" } else { path }, query),
        None => (if target.is_empty() { "/" } else { target }, ""),
    }
}

/// `application/json` or a structured `+json` media type.
fn is_json_content_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// Parse and URL-decode a query string (without the leading `?`).
#[must_use]
pub fn parse_query_params(query: &str) -> ParamVec {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
        .collect()
}

/// Parse a `Cookie` header value into name/value pairs.
#[must_use]
pub fn parse_cookies(header: &str) -> ParamVec {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim();
            Some((Arc::from(name), value.to_string()))
        })
        .collect()
}

/// Per-request scratch values shared along one handler chain.
///
/// Steps run strictly in order, so a value written by an earlier step is
/// visible to every later one.
#[derive(Debug, Default)]
pub struct Locals {
    values: DashMap<String, Value>,
}

impl Locals {
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.remove(key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read-only view of one inbound request.
#[derive(Debug)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    path: String,
    original_path: String,
    route: Option<Arc<str>>,
    params: ParamVec,
    query: ParamVec,
    headers: HeaderVec,
    body: Option<Value>,
    locals: Locals,
}

impl RequestContext {
    /// Wrap a raw request.
    ///
    /// `path` is the path the pipeline routes on, which differs from
    /// `raw.path` when the pipeline is mounted under a prefix. `route` and
    /// `params` come from the matched route, if any.
    pub fn new(raw: RawRequest, path: &str, route: Option<Arc<str>>, params: ParamVec) -> Self {
        let request_id = RequestId::from_header_or_new(raw.header(REQUEST_ID_HEADER));
        Self {
            request_id,
            method: raw.method,
            path: path.to_string(),
            original_path: raw.path,
            route,
            params,
            query: raw.query,
            headers: raw.headers,
            body: raw.body,
            locals: Locals::default(),
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path as seen by this pipeline (mount prefix removed).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path as received by the transport.
    #[must_use]
    pub fn original_path(&self) -> &str {
        &self.original_path
    }

    /// Pattern of the matched route, if any.
    #[must_use]
    pub fn route_pattern(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Get a path parameter by name ("last write wins" on repeated names).
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn params(&self) -> &ParamVec {
        &self.params
    }

    /// Get a query parameter by name ("last write wins" on `?a=1&a=2`).
    #[inline]
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn query_params(&self) -> &ParamVec {
        &self.query
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    /// Get a cookie from the `Cookie` header.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.header("cookie")?;
        parse_cookies(header)
            .into_iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }

    #[must_use]
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Deserialize the body, answering 400 when it is missing or malformed.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let body = self
            .body
            .as_ref()
            .ok_or_else(|| HandlerError::bad_request(serde_json::json!({ "error": "missing body" })))?;
        T::deserialize(body).map_err(|e| {
            HandlerError::bad_request(serde_json::json!({ "error": e.to_string() }))
        })
    }

    /// Scratch values shared by the steps of this request's chain.
    #[must_use]
    pub fn locals(&self) -> &Locals {
        &self.locals
    }
}
