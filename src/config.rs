//! # Pipeline Configuration
//!
//! Runtime-tunable pipeline behaviour, loaded from environment variables.
//! Transport-level limits (body size, timeouts) are not read here; they are
//! applied by the transport before the pipeline sees a request.
//!
//! ## Environment Variables
//!
//! ### `RELAY_STRICT_BINDING`
//!
//! When `true`, binding a controller whose route description names an action
//! the controller does not expose fails with
//! [`PipelineError::UnknownAction`](crate::PipelineError::UnknownAction).
//! When `false` (default) such actions are dropped with a warning.
//!
//! ### `RELAY_EXPOSE_ERROR_MESSAGE`
//!
//! Whether the `500` fallback body includes the error message. Default `true`.
//!
//! ### `RELAY_TRAILING_SLASH`
//!
//! Whether `/users/` matches a route registered as `/users`. Default `true`.
//!
//! ## Usage
//!
//! ```rust
//! use relayroute::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_env();
//! println!("strict binding: {}", config.strict_binding);
//! ```

use std::env;

/// Pipeline behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Fail controller binding on unknown action names
    pub strict_binding: bool,
    /// Include the error message in 500 fallback bodies
    pub expose_error_message: bool,
    /// Let `/path/` match a route registered as `/path`
    pub trailing_slash: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strict_binding: false,
            expose_error_message: true,
            trailing_slash: true,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| parse_bool(&v))
                .unwrap_or(default)
        };
        Self {
            strict_binding: flag("RELAY_STRICT_BINDING", defaults.strict_binding),
            expose_error_message: flag(
                "RELAY_EXPOSE_ERROR_MESSAGE",
                defaults.expose_error_message,
            ),
            trailing_slash: flag("RELAY_TRAILING_SLASH", defaults.trailing_slash),
        }
    }
}

/// Accepts `true/false`, `1/0`, `yes/no`, `on/off` (case-insensitive).
pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::from_lookup(|_| None);
        assert_eq!(config, PipelineConfig::default());
        assert!(!config.strict_binding);
        assert!(config.expose_error_message);
        assert!(config.trailing_slash);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RELAY_STRICT_BINDING", "yes"),
            ("RELAY_EXPOSE_ERROR_MESSAGE", "0"),
            ("RELAY_TRAILING_SLASH", "garbage"),
        ]
        .into_iter()
        .collect();
        let config = PipelineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert!(config.strict_binding);
        assert!(!config.expose_error_message);
        // unparseable values keep the default
        assert!(config.trailing_slash);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool(" TRUE "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
