//! Path pattern compilation.
//!
//! Patterns are compiled once at registration into an anchored regex plus the
//! ordered list of parameter names. Two parameter spellings are accepted:
//! `/users/{id}` and `/users/:id`. Static segments are matched literally.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use super::ParamVec;
use crate::error::PipelineError;

static PARAM_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// A compiled route path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: Arc<str>,
    regex: Regex,
    param_names: Vec<Arc<str>>,
}

impl PathPattern {
    /// Compile `pattern`.
    ///
    /// With `trailing_slash` set, `/users/` also matches a pattern written as
    /// `/users`.
    pub fn compile(pattern: &str, trailing_slash: bool) -> Result<Self, PipelineError> {
        let invalid = |reason: &str| PipelineError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        if !pattern.starts_with('/') {
            return Err(invalid("pattern must start with '/'"));
        }

        let mut source = String::with_capacity(pattern.len() + 8);
        source.push('^');
        let mut param_names = Vec::with_capacity(pattern.matches(['{', ':']).count());

        for segment in pattern.split('/').filter(|s| !s.is_empty()) {
            source.push('/');
            match param_segment(segment) {
                Some(name) => {
                    if !is_valid_param_name(name) {
                        return Err(invalid("parameter names must be identifiers"));
                    }
                    source.push_str("([^/]+)");
                    param_names.push(Arc::from(name));
                }
                None => {
                    if segment.contains(['{', '}']) {
                        return Err(invalid("unbalanced braces in segment"));
                    }
                    source.push_str(&regex::escape(segment));
                }
            }
        }

        if source == "^" {
            source.push('/');
        } else if trailing_slash {
            source.push_str("/?");
        }
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| invalid(&e.to_string()))?;
        Ok(Self {
            raw: Arc::from(pattern),
            regex,
            param_names,
        })
    }

    /// The pattern as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub(crate) fn raw(&self) -> &Arc<str> {
        &self.raw
    }

    #[must_use]
    pub fn param_names(&self) -> &[Arc<str>] {
        &self.param_names
    }

    /// Match `path` (without query string), returning the decoded parameters.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<ParamVec> {
        let captures = self.regex.captures(path)?;
        let mut params = ParamVec::new();
        for (idx, name) in self.param_names.iter().enumerate() {
            if let Some(value) = captures.get(idx + 1) {
                let raw = value.as_str();
                let decoded = urlencoding::decode(raw)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| raw.to_string());
                params.push((Arc::clone(name), decoded));
            }
        }
        Some(params)
    }
}

fn param_segment(segment: &str) -> Option<&str> {
    if let Some(name) = segment.strip_prefix(':') {
        return Some(name);
    }
    segment.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
}

fn is_valid_param_name(name: &str) -> bool {
    match PARAM_NAME.as_ref() {
        Some(re) => re.is_match(name),
        None => !name.is_empty(),
    }
}
