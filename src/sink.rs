//! Transport response sinks.
//!
//! A [`ResponseSink`] is the write side a transport hands to the pipeline.
//! The pipeline calls `set_headers`, `set_status` and `send` at most once per
//! request, and only while [`ResponseSink::is_open`] reports true.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use tracing::warn;

use crate::response::{Body, HeaderVec, Response};

/// Write side of a transport response.
pub trait ResponseSink {
    fn set_headers(&mut self, headers: &HeaderVec);
    fn set_status(&mut self, status: StatusCode);
    fn send(&mut self, body: Body);

    /// False once the client has gone away; the pipeline stops advancing and
    /// writes nothing.
    fn is_open(&self) -> bool {
        true
    }
}

/// Apply a finalized response to a sink.
pub fn write_response<S: ResponseSink + ?Sized>(sink: &mut S, response: Response) {
    let (status, headers, body) = response.into_parts();
    sink.set_headers(&headers);
    sink.set_status(status);
    sink.send(body);
}

/// Sink that assembles an [`http::Response`].
#[derive(Debug)]
pub struct HttpResponseSink {
    status: StatusCode,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl Default for HttpResponseSink {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl HttpResponseSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_sent(&self) -> bool {
        self.body.is_some()
    }

    /// The assembled response, or `None` if nothing was sent.
    #[must_use]
    pub fn into_response(self) -> Option<http::Response<Vec<u8>>> {
        let body = self.body?;
        let mut response = http::Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        Some(response)
    }
}

impl ResponseSink for HttpResponseSink {
    fn set_headers(&mut self, headers: &HeaderVec) {
        for (name, value) in headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    self.headers.insert(name, value);
                }
                _ => warn!(header = %name, "Dropping invalid response header"),
            }
        }
    }

    fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    fn send(&mut self, body: Body) {
        self.body = Some(body.to_bytes());
    }
}

/// One call observed by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    SetHeaders(HeaderVec),
    SetStatus(StatusCode),
    Send(Body),
}

/// Lets a transport mark a [`RecordingSink`] as closed from elsewhere.
#[derive(Debug, Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// In-memory sink recording every call.
#[derive(Debug)]
pub struct RecordingSink {
    calls: Vec<SinkCall>,
    open: Arc<AtomicBool>,
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            open: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(Arc::clone(&self.open))
    }

    #[must_use]
    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    /// Number of `send` calls seen.
    #[must_use]
    pub fn send_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, SinkCall::Send(_)))
            .count()
    }

    /// Last status written.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.calls.iter().rev().find_map(|c| match c {
            SinkCall::SetStatus(s) => Some(*s),
            _ => None,
        })
    }

    /// Header value from the last `set_headers` call.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.calls.iter().rev().find_map(|c| match c {
            SinkCall::SetHeaders(headers) => headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        })
    }

    /// Body of the last `send` call.
    #[must_use]
    pub fn body(&self) -> Option<&Body> {
        self.calls.iter().rev().find_map(|c| match c {
            SinkCall::Send(b) => Some(b),
            _ => None,
        })
    }

    /// Body of the last `send` call as UTF-8 text.
    #[must_use]
    pub fn body_text(&self) -> Option<String> {
        self.body()
            .map(|b| String::from_utf8_lossy(&b.to_bytes()).into_owned())
    }
}

impl ResponseSink for RecordingSink {
    fn set_headers(&mut self, headers: &HeaderVec) {
        self.calls.push(SinkCall::SetHeaders(headers.clone()));
    }

    fn set_status(&mut self, status: StatusCode) {
        self.calls.push(SinkCall::SetStatus(status));
    }

    fn send(&mut self, body: Body) {
        self.calls.push(SinkCall::Send(body));
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
