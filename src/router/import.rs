//! Bulk tree import from the tagged node form.

use std::collections::hash_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::warn;

use crate::dispatcher::HandlerRef;
use crate::error::RouterError;

use super::core::{warn_unreachable_parts, Router};
use super::route::{MethodSet, Pattern, Route};
use super::tree::{RouteNode, RouteTree};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NodeSpec {
    #[serde(default)]
    children: BTreeMap<String, NodeSpec>,
    #[serde(default)]
    param: Option<String>,
    #[serde(default)]
    route: Option<RouteSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RouteSpec {
    handler: String,
    #[serde(default)]
    methods: Vec<String>,
    #[serde(default)]
    middleware: Vec<String>,
}

pub(crate) fn build_tree(value: &serde_json::Value, router: &Router) -> Result<RouteTree, RouterError> {
    if !value.is_object() {
        return Err(RouterError::InvalidRoutesFormat {
            detail: format!("expected an object, got {}", kind_of(value)),
        });
    }
    let spec = NodeSpec::deserialize(value).map_err(|e| RouterError::InvalidRoutesFormat {
        detail: e.to_string(),
    })?;
    let root = build_node(&spec, Vec::new(), router)?;
    Ok(RouteTree::from_root(root))
}

/// `segments` are the pattern tokens leading to this node (`users`, `{id}`, ...).
fn build_node(
    spec: &NodeSpec,
    mut segments: Vec<String>,
    router: &Router,
) -> Result<RouteNode, RouterError> {
    let mut node = RouteNode::new();

    if let Some(param) = &spec.param {
        segments.push(format!("{{{param}}}"));
    }
    // Validates the marker along with the rest of the path
    let here = Pattern::from_segments(&segments)?;
    if let Some(param) = &spec.param {
        node.param_name = Some(Arc::from(param.as_str()));
    }

    if let Some(route) = &spec.route {
        if route.handler.trim().is_empty() {
            return Err(RouterError::invalid_route(here.as_str(), "empty handler name"));
        }
        let methods = MethodSet::parse(here.as_str(), &route.methods)?;
        let middleware = router.resolve_middleware(&route.middleware)?;
        warn_unreachable_parts(&here);
        node.route = Some(Route {
            pattern: here.raw(),
            handler: HandlerRef::Named(Arc::from(route.handler.as_str())),
            methods,
            middleware,
        });
    }

    for (key, child) in &spec.children {
        if key.contains(['{', '}']) {
            return Err(RouterError::invalid_route(
                here.as_str(),
                format!("child segment '{key}' must be a literal"),
            ));
        }
        let key = if router.config().case_sensitive {
            key.clone()
        } else {
            key.to_lowercase()
        };
        let mut child_segments = segments.clone();
        child_segments.push(key.clone());
        let built = build_node(child, child_segments, router)?;

        // Keys that differ only in case land on the same folded key
        match node.children.entry(key) {
            Entry::Occupied(slot) => {
                let segment = slot.key().clone();
                for displaced in slot.into_mut().merge(built) {
                    warn!(
                        pattern = %here,
                        segment = %segment,
                        previous = %displaced.previous,
                        replacement = %displaced.replacement,
                        "Parameter marker replaced while merging imported nodes"
                    );
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(built);
            }
        }
    }

    Ok(node)
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_object_is_rejected() {
        let router = Router::new();
        let err = build_tree(&json!(["users"]), &router).unwrap_err();
        assert!(matches!(err, RouterError::InvalidRoutesFormat { .. }));
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let router = Router::new();
        let err = build_tree(&json!({"kids": {}}), &router).unwrap_err();
        assert!(matches!(err, RouterError::InvalidRoutesFormat { .. }));
    }

    #[test]
    fn test_keys_differing_in_case_are_merged() {
        let router = Router::new();
        let tree = build_tree(
            &json!({"children": {
                "Users": {"children": {"list": {"route": {"handler": "list_users"}}}},
                "users": {"children": {"show": {"route": {"handler": "show_user"}}}}
            }}),
            &router,
        )
        .unwrap();

        assert_eq!(tree.len(), 2);
        assert!(tree.find(&["users", "list"]).is_some());
        assert!(tree.find(&["users", "show"]).is_some());
    }

    #[test]
    fn test_case_sensitive_keys_stay_apart() {
        let router = Router::with_config(crate::runtime_config::RouterConfig::default().case_sensitive(true));
        let tree = build_tree(
            &json!({"children": {
                "Users": {"route": {"handler": "a"}},
                "users": {"route": {"handler": "b"}}
            }}),
            &router,
        )
        .unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree.find(&["Users"]).is_some());
        assert!(tree.find(&["users"]).is_some());
    }

    #[test]
    fn test_invalid_markers_and_keys_are_rejected() {
        let router = Router::new();
        for value in [
            json!({"children": {"a": {"param": ""}}}),
            json!({"children": {"a": {"param": "x/y"}}}),
            json!({"children": {"a": {"param": "x}{y"}}}),
            json!({"children": {"": {}}}),
            json!({"children": {"{id}": {}}}),
            json!({"children": {"a/b": {}}}),
        ] {
            let err = build_tree(&value, &router).unwrap_err();
            assert!(
                matches!(err, RouterError::InvalidRouteDefinition { .. }),
                "{value} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_patterns_are_reconstructed() {
        let router = Router::new();
        let tree = build_tree(
            &json!({"children": {"users": {"param": "id", "children": {
                "show": {"route": {"handler": "show_user"}}
            }}}}),
            &router,
        )
        .unwrap();
        let listed: Vec<String> = tree.describe().into_iter().map(|(p, _)| p).collect();
        assert_eq!(listed, vec!["/users/{id}/show".to_string()]);

        let m = tree.find(&["users", "9", "show"]).unwrap();
        assert_eq!(m.params.get("id"), Some("9"));
    }
}
