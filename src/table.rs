//! Route tables: a router described in a YAML or JSON file.
//!
//! ```yaml
//! case_sensitive: false
//! fallback: not_found
//! default: home
//! prefix: [trace]
//! routes:
//!   - path: /users/{id}/show
//!     handler: show_user
//!     methods: [GET, HEAD]
//!     middleware: [audit]
//! ```
//!
//! Handler and middleware names are resolved against a
//! [`HandlerRegistry`] when the table is built into a [`Router`].

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dispatcher::HandlerRegistry;
use crate::error::RouterError;
use crate::router::{MethodSet, Router};
use crate::runtime_config::RouterConfig;

/// One route entry of a [`RouteTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntry {
    pub path: String,
    pub handler: String,
    /// Empty means `GET`
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub middleware: Vec<String>,
}

/// Declarative router description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteTable {
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub fallback: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub page_error: Option<String>,
    #[serde(default)]
    pub prefix: Vec<String>,
    #[serde(default)]
    pub suffix: Vec<String>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

impl RouteTable {
    /// Load a table, choosing the format by extension (`.yaml`/`.yml`, else JSON).
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading route table {}", path.display()))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let table = if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        };
        table.with_context(|| format!("parsing route table {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Every handler name the table refers to, sorted and deduplicated.
    #[must_use]
    pub fn handler_names(&self) -> Vec<String> {
        let mut names: BTreeSet<&str> = self.routes.iter().map(|r| r.handler.as_str()).collect();
        names.extend(
            [&self.fallback, &self.default, &self.page_error]
                .into_iter()
                .flatten()
                .map(String::as_str),
        );
        names.into_iter().map(str::to_string).collect()
    }

    /// Every middleware name the table refers to, sorted and deduplicated.
    #[must_use]
    pub fn middleware_names(&self) -> Vec<String> {
        let names: BTreeSet<&str> = self
            .prefix
            .iter()
            .chain(&self.suffix)
            .chain(self.routes.iter().flat_map(|r| &r.middleware))
            .map(String::as_str)
            .collect();
        names.into_iter().map(str::to_string).collect()
    }

    /// Build a router from this table.
    ///
    /// Route handlers stay names and are resolved per request, so a route
    /// whose handler is missing from `registry` dispatches as a page error.
    /// Everything else must resolve now.
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition`, `InvalidMiddleware` or `InvalidArgumentKind`
    /// for the first entry that cannot be registered.
    pub fn build(&self, registry: HandlerRegistry) -> Result<Router, RouterError> {
        let config = RouterConfig::default().case_sensitive(self.case_sensitive);
        let mut router = Router::with_config(config).with_registry(registry);

        router.add_prefix_middleware_named(&self.prefix)?;
        router.add_suffix_middleware_named(&self.suffix)?;
        if let Some(name) = &self.fallback {
            router.set_fallback_named(name)?;
        }
        if let Some(name) = &self.default {
            router.set_default_named(name)?;
        }
        if let Some(name) = &self.page_error {
            router.set_page_error_named(name)?;
        }

        for entry in &self.routes {
            let methods = MethodSet::parse(&entry.path, &entry.methods)?;
            let middleware: Vec<&str> = entry.middleware.iter().map(String::as_str).collect();
            router.add_route_named(&entry.path, &entry.handler, methods, &middleware)?;
        }

        info!(
            routes_count = self.routes.len(),
            prefix_units = self.prefix.len(),
            suffix_units = self.suffix.len(),
            case_sensitive = self.case_sensitive,
            "Route table loaded"
        );
        Ok(router)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"
fallback: not_found
prefix: [trace]
routes:
  - path: /users/{id}/show
    handler: show_user
    methods: [GET, HEAD]
    middleware: [audit]
  - path: /about
    handler: about
"#;

    #[test]
    fn test_yaml_table_parses_with_defaults() {
        let table = RouteTable::from_yaml_str(TABLE).unwrap();
        assert!(!table.case_sensitive);
        assert_eq!(table.routes.len(), 2);
        assert!(table.routes[1].methods.is_empty());
        assert_eq!(table.handler_names(), vec!["about", "not_found", "show_user"]);
        assert_eq!(table.middleware_names(), vec!["audit", "trace"]);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(RouteTable::from_yaml_str("roots: []").is_err());
        assert!(RouteTable::from_json_str(r#"{"routes":[{"path":"/a"}]}"#).is_err());
    }

    #[test]
    fn test_build_reports_missing_names() {
        let table = RouteTable::from_yaml_str(TABLE).unwrap();
        let err = table.build(HandlerRegistry::new()).unwrap_err();
        assert!(matches!(err, RouterError::InvalidMiddleware { .. }));
    }
}
