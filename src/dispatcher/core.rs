//! Dispatcher core module - handler types, registry and dispatch results.

use crate::ids::RequestId;
use crate::middleware::Middleware;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Maximum number of captured path parameters before heap allocation.
/// The skip-and-capture protocol allows one parameter per tree position, so
/// real route tables rarely carry more than two or three.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum inline response headers before heap allocation
pub const MAX_INLINE_HEADERS: usize = 8;

/// Captured parameter storage: `(name, value)` pairs in capture order.
///
/// Names come from the route tree (shared `Arc<str>`), values from the request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Response header storage
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Parameters captured while matching a request path.
///
/// This is the sole argument every [`Handler`] receives. The fallback,
/// default and page-error handlers receive an empty instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: ParamVec,
}

impl RouteParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `value`. A later binding of the same name shadows the
    /// earlier one for [`get`](Self::get).
    pub fn insert(&mut self, name: Arc<str>, value: String) {
        self.params.push((name, value));
    }

    /// Get a parameter by name
    ///
    /// Uses "last write wins" semantics when the same name was bound twice
    /// along the matched path.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Convert to a HashMap
    /// Note: This allocates - use get() on the dispatch path instead
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Response produced by a handler or synthesised by the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    /// HTTP status code (200, 404, 405, 500, ...)
    pub status: u16,
    /// Response headers
    pub headers: HeaderVec,
    /// Response body
    pub body: String,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: String) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Plain text response
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, content_type("text/plain; charset=utf-8"), body.into())
    }

    /// HTML response, used for the router's built-in pages
    #[must_use]
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, content_type("text/html; charset=utf-8"), body.into())
    }

    /// JSON response with default headers
    #[must_use]
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self::new(status, content_type("application/json"), body.to_string())
    }

    /// JSON error response
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    /// Get a header by name (case-insensitive)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or update a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }
}

fn content_type(value: &str) -> HeaderVec {
    let mut headers = HeaderVec::new();
    headers.push((Arc::from("content-type"), value.to_string()));
    headers
}

/// The single callable type behind route handlers, the fallback, the
/// default handler and the page-error handler.
pub type Handler = Arc<dyn Fn(&RouteParams) -> HandlerResponse + Send + Sync>;

/// Wrap a closure as a [`Handler`].
pub fn handler_fn<F>(f: F) -> Handler
where
    F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
{
    Arc::new(f)
}

/// How a terminal route refers to its handler.
#[derive(Clone)]
pub enum HandlerRef {
    /// A closure supplied directly at registration
    Bound(Handler),
    /// A handler name looked up in the router's [`HandlerRegistry`] when a
    /// request reaches the route. An unresolved name is a handler defect.
    Named(Arc<str>),
}

impl HandlerRef {
    /// Resolve to a callable handler, or `None` if the name is unbound.
    #[must_use]
    pub fn resolve(&self, registry: &HandlerRegistry) -> Option<Handler> {
        match self {
            HandlerRef::Bound(h) => Some(Arc::clone(h)),
            HandlerRef::Named(name) => registry.handler(name),
        }
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            HandlerRef::Bound(_) => None,
            HandlerRef::Named(name) => Some(name.as_ref()),
        }
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRef::Bound(_) => f.write_str("Bound(<fn>)"),
            HandlerRef::Named(name) => write!(f, "Named({name})"),
        }
    }
}

/// Named handlers and middleware units available to route tables.
///
/// Populated during application wiring; route tables, tagged tree imports and
/// the `*_named` registration methods refer to entries by name.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
    middlewares: HashMap<String, Arc<dyn Middleware>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under `name`, replacing any previous binding.
    pub fn register_handler<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        self.insert_handler(name, Arc::new(f))
    }

    pub fn insert_handler(&mut self, name: &str, handler: Handler) -> &mut Self {
        if self.handlers.insert(name.to_string(), handler).is_some() {
            warn!(
                handler_name = %name,
                total_handlers = self.handlers.len(),
                "Replaced existing handler"
            );
        } else {
            info!(
                handler_name = %name,
                total_handlers = self.handlers.len(),
                "Handler registered"
            );
        }
        self
    }

    /// Register a middleware unit under `name`.
    pub fn register_middleware(&mut self, name: &str, mw: Arc<dyn Middleware>) -> &mut Self {
        if self.middlewares.insert(name.to_string(), mw).is_some() {
            warn!(
                middleware_name = %name,
                total_middlewares = self.middlewares.len(),
                "Replaced existing middleware"
            );
        } else {
            info!(
                middleware_name = %name,
                total_middlewares = self.middlewares.len(),
                "Middleware registered"
            );
        }
        self
    }

    #[must_use]
    pub fn handler(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).map(Arc::clone)
    }

    #[must_use]
    pub fn middleware(&self, name: &str) -> Option<Arc<dyn Middleware>> {
        self.middlewares.get(name).map(Arc::clone)
    }

    #[must_use]
    pub fn contains_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered handler names, sorted
    #[must_use]
    pub fn handler_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Which terminal state a request reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The matched route's handler ran
    Handled,
    /// Empty path, default handler ran
    Default,
    /// Empty path with no default handler; generic text returned
    NoPath,
    /// No route matched and the fallback ran
    Fallback,
    /// No route matched and no fallback is configured; nothing ran
    Unmatched,
    /// The matched route's handler could not be resolved
    PageError,
    /// The path matched but the method is not in the route's allowed set
    MethodNotAllowed,
}

impl Outcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Handled => "handled",
            Outcome::Default => "default",
            Outcome::NoPath => "no_path",
            Outcome::Fallback => "fallback",
            Outcome::Unmatched => "unmatched",
            Outcome::PageError => "page_error",
            Outcome::MethodNotAllowed => "method_not_allowed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`Router::handle_request`](crate::router::Router::handle_request).
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub request_id: RequestId,
    pub outcome: Outcome,
    /// `None` only for [`Outcome::Unmatched`]
    pub response: Option<HandlerResponse>,
}

impl Dispatch {
    /// Status code the transport should write, if any response was produced
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|r| r.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_params_last_binding_wins() {
        let mut params = RouteParams::new();
        params.insert(Arc::from("id"), "1".into());
        params.insert(Arc::from("id"), "2".into());
        assert_eq!(params.get("id"), Some("2"));
        assert_eq!(params.len(), 2);
        assert_eq!(params.to_map().get("id").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut resp = HandlerResponse::text(200, "ok");
        resp.set_header("Content-Type", "text/html".into());
        assert_eq!(resp.get_header("content-type"), Some("text/html"));
        assert_eq!(resp.headers.len(), 1);
    }

    #[test]
    fn test_named_ref_resolves_through_registry() {
        let mut registry = HandlerRegistry::new();
        registry.register_handler("home", |_| HandlerResponse::text(200, "home"));

        let bound = HandlerRef::Named(Arc::from("home"));
        let missing = HandlerRef::Named(Arc::from("gone"));
        let h = bound.resolve(&registry).expect("home is registered");
        assert_eq!(h(&RouteParams::new()).body, "home");
        assert!(missing.resolve(&registry).is_none());
    }

    #[test]
    fn test_constructors_set_one_content_type() {
        let resp = HandlerResponse::html(200, "<p>hi</p>");
        assert_eq!(resp.headers.len(), 1);
        assert_eq!(resp.get_header("content-type"), Some("text/html; charset=utf-8"));

        let resp = HandlerResponse::new(204, HeaderVec::new(), String::new());
        assert!(resp.headers.is_empty());
        assert_eq!(resp.get_header("content-type"), None);
    }

    #[test]
    fn test_handler_ref_name() {
        let named = HandlerRef::Named(Arc::from("show_user"));
        assert_eq!(named.name(), Some("show_user"));
        let bound = HandlerRef::Bound(handler_fn(|_| HandlerResponse::text(200, "")));
        assert_eq!(bound.name(), None);
    }

    #[test]
    fn test_middleware_registration_replaces() {
        use crate::middleware::RequestContext;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let hits = Arc::new(AtomicUsize::new(0));
        let mut registry = HandlerRegistry::new();
        registry.register_middleware("audit", Arc::new(|_: &RequestContext| {}));
        {
            let hits = Arc::clone(&hits);
            registry.register_middleware(
                "audit",
                Arc::new(move |_: &RequestContext| {
                    hits.fetch_add(1, Ordering::Relaxed);
                }),
            );
        }

        let unit = registry.middleware("audit").unwrap();
        unit.call(&RequestContext {
            request_id: crate::ids::RequestId::new(),
            method: http::Method::GET,
            path: "/a".to_string(),
            stage: crate::middleware::Stage::Prefix,
        });
        assert_eq!(hits.load(Ordering::Relaxed), 1);
        assert!(registry.middleware("missing").is_none());
    }

    #[test]
    fn test_error_response_is_json() {
        let resp = HandlerResponse::error(500, "boom");
        assert_eq!(resp.get_header("content-type"), Some("application/json"));
        assert_eq!(resp.body, r#"{"error":"boom"}"#);
    }
}
