//! Segment-keyed route tree.
//!
//! Each node is reached by one literal path segment. Parameters are not
//! children: a `{name}` token marks the node reached by the preceding literal,
//! and matching then captures the request segment that follows that literal.
//!
//! ## Insertion
//!
//! `/users/{id}/show` builds:
//!
//! ```text
//! root
//!  └─ "users"   param_name = "id"
//!      └─ "show"   route = show handler
//! ```
//!
//! ## Matching
//!
//! Segments are walked left to right. After descending into a child, the
//! child's route (if any) becomes the best match so far, together with a
//! snapshot of the parameters captured up to that point. If the child carries
//! a parameter marker, the next request segment is consumed and bound to it.
//! A segment with no matching child aborts the whole match.
//!
//! Consequences worth knowing:
//!
//! - `["users", "42", "show"]` against the tree above yields `{id: "42"}`.
//! - A route registered with a trailing parameter (`/users/{id}`) is recorded
//!   *before* the capture, so its handler sees the parameters captured
//!   earlier, not `id`.
//! - A deeper route overrides a shallower one reached on the same walk.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::dispatcher::RouteParams;

use super::route::{MethodSet, Pattern, Route, Token};

/// Node in the route tree.
#[derive(Clone, Debug, Default)]
pub struct RouteNode {
    /// Literal segment → child
    pub(crate) children: HashMap<String, RouteNode>,
    /// Parameter captured from the segment after this node's literal
    pub(crate) param_name: Option<Arc<str>>,
    /// Terminal route reachable at this node
    pub(crate) route: Option<Route>,
}

impl RouteNode {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(&self, segment: &str) -> Option<&RouteNode> {
        self.children.get(segment)
    }

    #[must_use]
    pub fn param_name(&self) -> Option<&str> {
        self.param_name.as_deref()
    }

    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    fn count_routes(&self) -> usize {
        usize::from(self.route.is_some())
            + self.children.values().map(RouteNode::count_routes).sum::<usize>()
    }

    /// Fold `other` into this node: its marker and route replace ours, and
    /// children with the same key are merged recursively.
    pub(crate) fn merge(&mut self, other: RouteNode) -> Vec<Displaced> {
        let mut displaced = Vec::new();
        self.merge_into(other, &mut displaced);
        displaced
    }

    fn merge_into(&mut self, other: RouteNode, displaced: &mut Vec<Displaced>) {
        if let Some(name) = other.param_name {
            if let Some(previous) = self.param_name.replace(Arc::clone(&name)) {
                if previous != name {
                    displaced.push(Displaced {
                        previous,
                        replacement: name,
                    });
                }
            }
        }
        if other.route.is_some() {
            self.route = other.route;
        }
        for (key, child) in other.children {
            match self.children.entry(key) {
                Entry::Occupied(slot) => slot.into_mut().merge_into(child, displaced),
                Entry::Vacant(slot) => {
                    slot.insert(child);
                }
            }
        }
    }

    fn collect_routes<'a>(&'a self, out: &mut Vec<&'a Route>) {
        if let Some(route) = &self.route {
            out.push(route);
        }
        for child in self.children.values() {
            child.collect_routes(out);
        }
    }
}

/// A successful lookup: the route that won and the parameters it sees.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: RouteParams,
}

/// Previous parameter marker displaced by an insertion, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Displaced {
    pub previous: Arc<str>,
    pub replacement: Arc<str>,
}

/// Owner of the root node.
#[derive(Clone, Debug, Default)]
pub struct RouteTree {
    root: RouteNode,
    /// Terminal routes below `root`, kept current by every mutation
    routes: usize,
}

impl RouteTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_root(root: RouteNode) -> Self {
        let routes = root.count_routes();
        Self { root, routes }
    }

    #[must_use]
    pub fn root(&self) -> &RouteNode {
        &self.root
    }

    /// Attach `route` at the node `pattern` leads to.
    ///
    /// Literal tokens descend (creating children as needed); parameter tokens
    /// mark the current node. An existing route at the target node is
    /// replaced. Returns parameter markers that were overwritten on the way.
    pub fn insert(&mut self, pattern: &Pattern, route: Route) -> Vec<Displaced> {
        let mut displaced = Vec::new();
        let mut node = &mut self.root;
        for token in pattern.tokens() {
            match token {
                Token::Literal(segment) => {
                    node = node.children.entry(segment.clone()).or_default();
                }
                Token::Param(name) => {
                    if let Some(previous) = node.param_name.replace(Arc::clone(name)) {
                        if previous != *name {
                            displaced.push(Displaced {
                                previous,
                                replacement: Arc::clone(name),
                            });
                        }
                    }
                }
            }
        }
        if node.route.replace(route).is_none() {
            self.routes += 1;
        }
        displaced
    }

    /// Look up a segmented request path.
    ///
    /// `segments` must already be normalised (non-empty, case-folded when the
    /// router is case-insensitive).
    #[must_use]
    pub fn find<S: AsRef<str>>(&self, segments: &[S]) -> Option<RouteMatch<'_>> {
        let mut node = &self.root;
        let mut params = RouteParams::new();
        let mut best: Option<RouteMatch<'_>> = None;

        let mut i = 0;
        while i < segments.len() {
            node = node.children.get(segments[i].as_ref())?;

            if let Some(route) = &node.route {
                best = Some(RouteMatch {
                    route,
                    params: params.clone(),
                });
            }

            if let Some(name) = &node.param_name {
                i += 1;
                match segments.get(i) {
                    Some(value) => params.insert(Arc::clone(name), value.as_ref().to_string()),
                    // Nothing left to capture
                    None => break,
                }
            }

            i += 1;
        }

        best
    }

    /// Number of terminal routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every terminal route as `(pattern, methods)`, sorted by pattern.
    #[must_use]
    pub fn describe(&self) -> Vec<(String, MethodSet)> {
        let mut routes = Vec::new();
        self.root.collect_routes(&mut routes);
        let mut out: Vec<(String, MethodSet)> = routes
            .into_iter()
            .map(|r| (r.pattern.to_string(), r.methods.clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Patterns of registered routes whose last token is a parameter.
    #[must_use]
    pub fn trailing_param_patterns(&self) -> Vec<String> {
        let mut routes = Vec::new();
        self.root.collect_routes(&mut routes);
        let mut out: Vec<String> = routes
            .into_iter()
            .filter(|r| {
                Pattern::parse(&r.pattern)
                    .map(|p| p.has_trailing_param())
                    .unwrap_or(false)
            })
            .map(|r| r.pattern.to_string())
            .collect();
        out.sort();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{handler_fn, HandlerRef, HandlerResponse};

    fn route(pattern: &str, body: &'static str) -> (Pattern, Route) {
        let p = Pattern::parse(pattern).unwrap();
        let r = Route {
            pattern: p.raw(),
            handler: HandlerRef::Bound(handler_fn(move |_| HandlerResponse::text(200, body))),
            methods: MethodSet::default(),
            middleware: Vec::new(),
        };
        (p, r)
    }

    fn tree_with(patterns: &[(&str, &'static str)]) -> RouteTree {
        let mut tree = RouteTree::new();
        for (pattern, body) in patterns {
            let (p, r) = route(pattern, body);
            tree.insert(&p, r);
        }
        tree
    }

    fn body_of(m: &RouteMatch<'_>) -> String {
        match &m.route.handler {
            HandlerRef::Bound(h) => h(&m.params).body,
            HandlerRef::Named(n) => n.to_string(),
        }
    }

    #[test]
    fn test_insert_param_marks_current_node() {
        let tree = tree_with(&[("/users/{id}/show", "show")]);
        let users = tree.root().child("users").unwrap();
        assert_eq!(users.param_name(), Some("id"));
        assert!(users.route().is_none());
        assert!(users.child("show").unwrap().route().is_some());
        assert!(users.child("{id}").is_none());
    }

    #[test]
    fn test_find_literal_route() {
        let tree = tree_with(&[("/about/team", "team")]);
        let m = tree.find(&["about", "team"]).unwrap();
        assert_eq!(body_of(&m), "team");
        assert!(m.params.is_empty());
    }

    #[test]
    fn test_find_captures_between_literals() {
        let tree = tree_with(&[("/users/{id}/show", "show")]);
        let m = tree.find(&["users", "42", "show"]).unwrap();
        assert_eq!(body_of(&m), "show");
        assert_eq!(m.params.get("id"), Some("42"));
    }

    #[test]
    fn test_mismatch_after_shallow_route_is_no_match() {
        let tree = tree_with(&[("/users", "list")]);
        assert!(tree.find(&["users"]).is_some());
        assert!(tree.find(&["users", "nope"]).is_none());
    }

    #[test]
    fn test_deeper_route_overrides_shallower() {
        let tree = tree_with(&[("/docs", "docs"), ("/docs/api", "api")]);
        assert_eq!(body_of(&tree.find(&["docs"]).unwrap()), "docs");
        assert_eq!(body_of(&tree.find(&["docs", "api"]).unwrap()), "api");
    }

    #[test]
    fn test_prefix_route_with_param_marker() {
        let tree = tree_with(&[("/users", "list"), ("/users/{id}/show", "show")]);
        // Nothing after "users" to capture: the prefix route wins.
        let m = tree.find(&["users"]).unwrap();
        assert_eq!(body_of(&m), "list");
        assert!(m.params.is_empty());

        // Captured segment followed by no literal: still the prefix route.
        let m = tree.find(&["users", "42"]).unwrap();
        assert_eq!(body_of(&m), "list");
    }

    #[test]
    fn test_trailing_param_snapshot_precedes_capture() {
        let tree = tree_with(&[("/users/{id}", "user")]);
        let m = tree.find(&["users", "42"]).unwrap();
        assert_eq!(body_of(&m), "user");
        assert_eq!(m.params.get("id"), None);
        assert_eq!(tree.trailing_param_patterns(), vec!["/users/{id}".to_string()]);
    }

    #[test]
    fn test_two_params_at_separate_positions() {
        let tree = tree_with(&[("/org/{org}/team/{team}/members", "members")]);
        let m = tree.find(&["org", "acme", "team", "core", "members"]).unwrap();
        assert_eq!(m.params.get("org"), Some("acme"));
        assert_eq!(m.params.get("team"), Some("core"));
    }

    #[test]
    fn test_reinsert_replaces_route_and_keeps_siblings() {
        let mut tree = tree_with(&[("/a/b", "first"), ("/a/c", "sibling")]);
        let (p, r) = route("/a/b", "second");
        tree.insert(&p, r);
        assert_eq!(body_of(&tree.find(&["a", "b"]).unwrap()), "second");
        assert_eq!(body_of(&tree.find(&["a", "c"]).unwrap()), "sibling");
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_conflicting_param_names_are_reported() {
        let mut tree = tree_with(&[("/users/{id}/show", "show")]);
        let (p, r) = route("/users/{uid}/edit", "edit");
        let displaced = tree.insert(&p, r);
        assert_eq!(displaced.len(), 1);
        assert_eq!(displaced[0].previous.as_ref(), "id");
        // Marker is per node: the last name wins for every route below it.
        let m = tree.find(&["users", "7", "show"]).unwrap();
        assert_eq!(m.params.get("uid"), Some("7"));
    }

    #[test]
    fn test_len_tracks_inserts_and_replacements() {
        let mut tree = RouteTree::new();
        assert_eq!(tree.len(), 0);
        for (pattern, body) in [("/a", "1"), ("/a/b", "2"), ("/a", "3"), ("/c/{x}/d", "4")] {
            let (p, r) = route(pattern, body);
            tree.insert(&p, r);
        }
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.len(), tree.describe().len());

        let rebuilt = RouteTree::from_root(tree.root().clone());
        assert_eq!(rebuilt.len(), 3);
        assert!(RouteTree::from_root(RouteNode::new()).is_empty());
    }

    #[test]
    fn test_merge_combines_subtrees() {
        let left = tree_with(&[("/docs/list", "list"), ("/users/{id}/show", "show")]);
        let right = tree_with(&[("/users/{uid}/edit", "edit"), ("/docs/list", "list2")]);

        let mut root = left.root().clone();
        let displaced = root.merge(right.root().clone());
        assert_eq!(displaced.len(), 1);
        assert_eq!(displaced[0].replacement.as_ref(), "uid");

        let merged = RouteTree::from_root(root);
        assert_eq!(merged.len(), 3);
        assert_eq!(body_of(&merged.find(&["docs", "list"]).unwrap()), "list2");
        let m = merged.find(&["users", "5", "show"]).unwrap();
        assert_eq!(m.params.get("uid"), Some("5"));
        assert!(merged.find(&["users", "5", "edit"]).is_some());
    }

    #[test]
    fn test_describe_lists_routes_sorted() {
        let tree = tree_with(&[("/b", "b"), ("/a/{x}/y", "a")]);
        let listed: Vec<String> = tree.describe().into_iter().map(|(p, _)| p).collect();
        assert_eq!(listed, vec!["/a/{x}/y".to_string(), "/b".to_string()]);
        assert!(!tree.is_empty());
        assert!(RouteTree::new().is_empty());
    }
}
