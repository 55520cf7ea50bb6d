//! Route table core - read-only after startup, hot path for matching.

use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::pattern::PathPattern;
use crate::error::PipelineError;
use crate::handler::{Handler, HandlerChain};

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage.
///
/// Param names use `Arc<str>`: path parameter names come from the compiled
/// route patterns, so cloning them per request is an atomic increment.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A registered route: method, compiled pattern, ordered handler chain.
pub struct RouteEntry {
    method: Method,
    pattern: PathPattern,
    chain: HandlerChain,
}

impl RouteEntry {
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    #[must_use]
    pub fn handlers(&self) -> &[Arc<dyn Handler>] {
        self.chain.handlers()
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("handlers", &self.chain.len())
            .finish()
    }
}

/// Result of matching a request against the table.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub entry: &'a RouteEntry,
    /// Path parameters extracted from the URL (e.g., `:id` → `("id", "123")`)
    pub path_params: ParamVec,
}

impl RouteMatch<'_> {
    /// Get a path parameter by name.
    ///
    /// Uses "last write wins" semantics when a name repeats in the pattern.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered route table.
pub struct RouteTable {
    routes: Vec<RouteEntry>,
    trailing_slash: bool,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RouteTable {
    #[must_use]
    pub fn new(trailing_slash: bool) -> Self {
        Self {
            routes: Vec::new(),
            trailing_slash,
        }
    }

    /// Add a route, or replace the chain of an existing route with the same
    /// method and pattern (keeping its priority).
    pub fn insert(
        &mut self,
        method: Method,
        pattern: &str,
        chain: HandlerChain,
    ) -> Result<(), PipelineError> {
        if chain.is_empty() {
            return Err(PipelineError::EmptyChain {
                method,
                pattern: pattern.to_string(),
            });
        }

        if let Some(existing) = self
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.pattern.as_str() == pattern)
        {
            warn!(
                method = %method,
                pattern = %pattern,
                handlers = chain.len(),
                "Replaced existing route"
            );
            existing.chain = chain;
            return Ok(());
        }

        let compiled = PathPattern::compile(pattern, self.trailing_slash)?;
        info!(
            method = %method,
            pattern = %pattern,
            params = ?compiled.param_names(),
            handlers = chain.len(),
            priority = self.routes.len(),
            "Route registered"
        );
        self.routes.push(RouteEntry {
            method,
            pattern: compiled,
            chain,
        });
        Ok(())
    }

    /// Match a request path (without query string).
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        let found = self.find(method, path).or_else(|| {
            if *method == Method::HEAD {
                self.find(&Method::GET, path)
            } else {
                None
            }
        });

        match &found {
            Some(m) => debug!(
                method = %method,
                path = %path,
                route_pattern = %m.entry.pattern.as_str(),
                path_params = ?m.path_params,
                "Route matched"
            ),
            None => debug!(method = %method, path = %path, "No route matched"),
        }
        found
    }

    fn find(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        self.routes
            .iter()
            .filter(|r| r.method == *method)
            .find_map(|entry| {
                entry.pattern.matches(path).map(|path_params| RouteMatch {
                    entry,
                    path_params,
                })
            })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.iter()
    }

    /// `METHOD pattern` strings in priority order.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.routes
            .iter()
            .map(|r| format!("{} {}", r.method, r.pattern.as_str()))
            .collect()
    }
}
