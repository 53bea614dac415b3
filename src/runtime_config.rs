//! # Runtime Configuration Module
//!
//! Environment-driven configuration for router construction.
//!
//! ## Environment Variables
//!
//! ### `SEGR_CASE_SENSITIVE`
//!
//! Whether incoming paths are matched verbatim. Accepts `true`/`false`
//! (also `1`/`0`, `yes`/`no`). When false, the request path is lower-cased
//! before segmentation and literal route segments are lower-cased when they
//! are registered.
//!
//! Default: `false`
//!
//! ## Usage
//!
//! ```rust
//! use segrouter::runtime_config::RouterConfig;
//! use segrouter::router::Router;
//!
//! let router = Router::with_config(RouterConfig::from_env());
//! # let _ = router;
//! ```

use std::env;

/// Router-wide configuration, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RouterConfig {
    /// Match path segments verbatim instead of lower-casing them (default: false)
    pub case_sensitive: bool,
}

impl RouterConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let case_sensitive = env::var("SEGR_CASE_SENSITIVE")
            .ok()
            .and_then(|val| parse_flag(&val))
            .unwrap_or(false);
        RouterConfig { case_sensitive }
    }

    #[must_use]
    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_case_insensitive() {
        assert!(!RouterConfig::default().case_sensitive);
    }

    #[test]
    fn test_parse_flag_variants() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" yes "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
