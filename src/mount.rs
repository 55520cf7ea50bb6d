//! Prefix-mounted pipelines.
//!
//! An [`App`] tries its mounted pipelines in mount order. Each mount whose
//! prefix matches the request path (on a segment boundary) sees the path
//! with the prefix stripped. A mount that passes through hands the request
//! to the next matching mount; once every mount has passed, the
//! transport's pass-through fires exactly once. A response or error from
//! any mount ends the request.

use std::sync::Arc;

use tracing::debug;

use crate::error::PipelineError;
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::pipeline::{finish, Disposition, Pipeline, Resolution};
use crate::request::RawRequest;
use crate::sink::ResponseSink;

struct Mount {
    prefix: String,
    pipeline: Arc<Pipeline>,
}

/// Ordered set of pipelines mounted under path prefixes.
#[derive(Default)]
pub struct App {
    mounts: Vec<Mount>,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `pipeline` under `prefix` (`"/"` mounts at the root).
    pub fn mount(
        &mut self,
        prefix: &str,
        pipeline: impl Into<Arc<Pipeline>>,
    ) -> Result<&mut Self, PipelineError> {
        if !prefix.starts_with('/') {
            return Err(PipelineError::InvalidPattern {
                pattern: prefix.to_string(),
                reason: "mount prefix must start with '/'".to_string(),
            });
        }
        let prefix = match prefix.trim_end_matches('/') {
            "" => "/".to_string(),
            trimmed => trimmed.to_string(),
        };
        debug!(prefix = %prefix, position = self.mounts.len(), "Pipeline mounted");
        self.mounts.push(Mount {
            prefix,
            pipeline: pipeline.into(),
        });
        Ok(self)
    }

    /// Mounted prefixes, in mount order.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.mounts.iter().map(|m| m.prefix.as_str())
    }

    /// Run one request through the matching mounts.
    ///
    /// Same contract as [`Pipeline::handle`]: exactly one of response or
    /// pass-through, or nothing if the sink closed.
    pub async fn handle<S, P>(&self, raw: RawRequest, sink: &mut S, pass_through: P) -> Disposition
    where
        S: ResponseSink + ?Sized,
        P: FnOnce(),
    {
        // pin one request id across every mount the request visits
        let raw = if RequestId::from_header(raw.header(REQUEST_ID_HEADER)).is_some() {
            raw
        } else {
            raw.with_header(REQUEST_ID_HEADER, RequestId::new().to_string())
        };

        let mut resolution = Resolution::Open;
        for mount in &self.mounts {
            let Some(path) = strip_prefix(&mount.prefix, &raw.path) else {
                continue;
            };
            debug!(prefix = %mount.prefix, path = %path, "Trying mount");
            resolution = mount.pipeline.resolve(raw.clone(), path, &*sink).await;
            if !matches!(resolution, Resolution::Open) {
                break;
            }
        }
        finish(resolution, sink, pass_through)
    }
}

/// Path as seen by a pipeline mounted at `prefix`, or `None` if the prefix
/// does not match on a segment boundary.
pub(crate) fn strip_prefix<'a>(prefix: &str, path: &'a str) -> Option<&'a str> {
    if prefix == "/" {
        return Some(path);
    }
    match path.strip_prefix(prefix)? {
        "" => Some("/"),
        rest if rest.starts_with('/') => Some(rest),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_prefix() {
        assert_eq!(strip_prefix("/", "/users"), Some("/users"));
        assert_eq!(strip_prefix("/api", "/api"), Some("/"));
        assert_eq!(strip_prefix("/api", "/api/users"), Some("/users"));
        assert_eq!(strip_prefix("/api", "/api/"), Some("/"));
        assert_eq!(strip_prefix("/api", "/apiary"), None);
        assert_eq!(strip_prefix("/api", "/other"), None);
    }

    #[test]
    fn test_mount_normalizes_prefix() {
        let mut app = App::new();
        app.mount("/api/", Pipeline::new()).unwrap();
        app.mount("/", Pipeline::new()).unwrap();
        assert_eq!(app.prefixes().collect::<Vec<_>>(), vec!["/api", "/"]);
        assert!(app.mount("api", Pipeline::new()).is_err());
    }
}
