#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use http::Method;
use parking_lot::Mutex;
use relayroute::handler::from_fn;
use relayroute::{
    Disposition, Handler, HandlerError, Pipeline, RawRequest, RecordingSink, Reply,
    RequestContext,
};

/// Routes `tracing` output through the test harness for the current thread.
pub struct TestTracing {
    _guard: tracing::subscriber::DefaultGuard,
}

impl TestTracing {
    pub fn init() -> Self {
        let subscriber = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        Self {
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }
}

pub fn get(target: &str) -> RawRequest {
    RawRequest::new(Method::GET, target)
}

pub fn post_json(target: &str, body: serde_json::Value) -> RawRequest {
    RawRequest::new(Method::POST, target)
        .with_header("content-type", "application/json")
        .with_body(body)
}

/// Counts pass-through invocations.
#[derive(Clone, Default)]
pub struct PassCounter(Arc<AtomicUsize>);

impl PassCounter {
    pub fn action(&self) -> impl FnOnce() {
        let count = Arc::clone(&self.0);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ordered record of which steps ran.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    /// A synchronous step that records its name, then returns `f(ctx)`.
    pub fn step<R, F>(&self, name: &'static str, f: F) -> impl Handler
    where
        F: Fn(&RequestContext) -> Result<R, HandlerError> + Send + Sync + 'static,
        R: Into<Reply> + 'static,
    {
        let log = self.clone();
        from_fn(name, move |ctx: &RequestContext| {
            log.record(name);
            f(ctx)
        })
    }

    /// A step that records its name and continues.
    pub fn pass(&self, name: &'static str) -> impl Handler {
        self.step(name, |_| Ok::<_, HandlerError>(()))
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Outcome of driving one request.
pub struct Run {
    pub disposition: Disposition,
    pub sink: RecordingSink,
    pub passes: usize,
}

pub async fn run(pipeline: &Pipeline, raw: RawRequest) -> Run {
    let mut sink = RecordingSink::new();
    let passes = PassCounter::default();
    let disposition = pipeline.handle(raw, &mut sink, passes.action()).await;
    Run {
        disposition,
        sink,
        passes: passes.count(),
    }
}

impl Run {
    /// Exactly one terminal action fired.
    pub fn assert_single_terminal(&self) {
        let sends = self.sink.send_count();
        assert_eq!(
            sends + self.passes,
            1,
            "expected exactly one terminal action, got {sends} send(s) and {} pass-through(s)",
            self.passes
        );
    }

    pub fn status(&self) -> Option<u16> {
        self.sink.status().map(|s| s.as_u16())
    }

    pub fn text(&self) -> String {
        self.sink.body_text().unwrap_or_default()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.text()).unwrap()
    }
}
