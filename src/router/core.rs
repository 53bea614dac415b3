//! Router core module - registration surface and the dispatch state machine.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;
use tracing::{debug, error, info, info_span, warn};

use crate::dispatcher::{
    Dispatch, Handler, HandlerRef, HandlerRegistry, HandlerResponse, Outcome, RouteParams,
};
use crate::error::RouterError;
use crate::ids::RequestId;
use crate::middleware::{Middleware, RequestContext, Stage};
use crate::runtime_config::RouterConfig;

use super::import;
use super::route::{MethodSet, Pattern, Route};
use super::tree::{RouteMatch, RouteTree};

/// Body of the built-in response for an empty path with no default handler
pub const NO_PATH_BODY: &str = "<h1>No page path was provided.</h1>";

/// Body of the built-in response for an unresolvable route handler
pub const PAGE_ERROR_BODY: &str = "<h1>There is an issue with the page you are trying to access.</h1>";

/// Body of the 405 response
pub const METHOD_NOT_ALLOWED_BODY: &str = "Method Not Allowed";

/// Log label for a route handler supplied as a closure
const BOUND_HANDLER: &str = "<bound>";

/// Inline capacity for request path segments
const MAX_INLINE_SEGMENTS: usize = 16;

/// Request router: route tree, global middleware chains and the special
/// handlers (fallback, default, page error).
///
/// Build it once during start-up, then share it read-only between request
/// threads. Nothing here locks; registering routes while requests are being
/// handled needs external synchronisation.
#[derive(Clone, Default)]
pub struct Router {
    tree: RouteTree,
    registry: HandlerRegistry,
    prefix_units: Vec<Arc<dyn Middleware>>,
    suffix_units: Vec<Arc<dyn Middleware>>,
    fallback: Option<Handler>,
    default_handler: Option<Handler>,
    page_error: Option<Handler>,
    config: RouterConfig,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.tree.len())
            .field("prefix_units", &self.prefix_units.len())
            .field("suffix_units", &self.suffix_units.len())
            .field("fallback", &self.fallback.is_some())
            .field("default_handler", &self.default_handler.is_some())
            .field("page_error", &self.page_error.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl Router {
    /// Case-insensitive router with an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Use `registry` to resolve named handlers and middleware.
    #[must_use]
    pub fn with_registry(mut self, registry: HandlerRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn config(&self) -> RouterConfig {
        self.config
    }

    #[must_use]
    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.registry
    }

    #[must_use]
    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    // ---------------------------------------------------------------------
    // Special handlers
    // ---------------------------------------------------------------------

    /// Handler for paths that match no route.
    pub fn set_fallback<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(f));
        self
    }

    /// Handler for requests whose path has no segments (`""`, `/`, `//`).
    pub fn set_default<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        self.default_handler = Some(Arc::new(f));
        self
    }

    /// Handler for matched routes whose handler cannot be resolved.
    /// Takes precedence over the fallback for that case.
    pub fn set_page_error<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        self.page_error = Some(Arc::new(f));
        self
    }

    /// Set the fallback to a registry handler.
    ///
    /// # Errors
    ///
    /// `InvalidArgumentKind` if `name` is not registered.
    pub fn set_fallback_named(&mut self, name: &str) -> Result<&mut Self, RouterError> {
        self.fallback = Some(self.lookup_slot("fallback", name)?);
        Ok(self)
    }

    /// Set the default handler to a registry handler.
    ///
    /// # Errors
    ///
    /// `InvalidArgumentKind` if `name` is not registered.
    pub fn set_default_named(&mut self, name: &str) -> Result<&mut Self, RouterError> {
        self.default_handler = Some(self.lookup_slot("default", name)?);
        Ok(self)
    }

    /// Set the page-error handler to a registry handler.
    ///
    /// # Errors
    ///
    /// `InvalidArgumentKind` if `name` is not registered.
    pub fn set_page_error_named(&mut self, name: &str) -> Result<&mut Self, RouterError> {
        self.page_error = Some(self.lookup_slot("page_error", name)?);
        Ok(self)
    }

    fn lookup_slot(&self, slot: &'static str, name: &str) -> Result<Handler, RouterError> {
        self.registry
            .handler(name)
            .ok_or_else(|| RouterError::InvalidArgumentKind {
                slot,
                name: name.to_string(),
            })
    }

    // ---------------------------------------------------------------------
    // Global middleware
    // ---------------------------------------------------------------------

    /// Append one unit to the prefix chain.
    pub fn add_prefix_middleware<M: Middleware + 'static>(&mut self, unit: M) -> &mut Self {
        self.prefix_units.push(Arc::new(unit));
        self
    }

    /// Append several units to the prefix chain, in order.
    pub fn add_prefix_middlewares<I>(&mut self, units: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.prefix_units.extend(units);
        self
    }

    /// Append registry units to the prefix chain. Either every name resolves
    /// and all are appended, or nothing is.
    ///
    /// # Errors
    ///
    /// `InvalidMiddleware` naming the first unresolved unit.
    pub fn add_prefix_middleware_named<I, S>(&mut self, names: I) -> Result<&mut Self, RouterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let units = self.resolve_middleware(names)?;
        self.prefix_units.extend(units);
        Ok(self)
    }

    /// Append one unit to the suffix chain.
    pub fn add_suffix_middleware<M: Middleware + 'static>(&mut self, unit: M) -> &mut Self {
        self.suffix_units.push(Arc::new(unit));
        self
    }

    /// Append several units to the suffix chain, in order.
    pub fn add_suffix_middlewares<I>(&mut self, units: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.suffix_units.extend(units);
        self
    }

    /// Append registry units to the suffix chain, all or nothing.
    ///
    /// # Errors
    ///
    /// `InvalidMiddleware` naming the first unresolved unit.
    pub fn add_suffix_middleware_named<I, S>(&mut self, names: I) -> Result<&mut Self, RouterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let units = self.resolve_middleware(names)?;
        self.suffix_units.extend(units);
        Ok(self)
    }

    pub(crate) fn resolve_middleware<I, S>(
        &self,
        names: I,
    ) -> Result<Vec<Arc<dyn Middleware>>, RouterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                self.registry
                    .middleware(name)
                    .ok_or_else(|| RouterError::InvalidMiddleware {
                        name: name.to_string(),
                    })
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Routes
    // ---------------------------------------------------------------------

    /// Register a `GET` route with no route middleware.
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition` if the pattern is malformed.
    pub fn add_route<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        self.add_route_with(pattern, handler, MethodSet::default(), Vec::new())
    }

    /// Register a route with explicit methods and route middleware.
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition` if the pattern is malformed.
    pub fn add_route_with<F>(
        &mut self,
        pattern: &str,
        handler: F,
        methods: MethodSet,
        middleware: Vec<Arc<dyn Middleware>>,
    ) -> Result<&mut Self, RouterError>
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        let pattern = Pattern::parse(pattern)?;
        self.insert_route(
            pattern,
            HandlerRef::Bound(Arc::new(handler)),
            methods,
            middleware,
        );
        Ok(self)
    }

    /// Register a route whose handler is looked up in the registry when a
    /// request reaches it. Middleware names are resolved now.
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition` for a malformed pattern or empty handler name,
    /// `InvalidMiddleware` for an unregistered middleware name.
    pub fn add_route_named(
        &mut self,
        pattern: &str,
        handler_name: &str,
        methods: MethodSet,
        middleware: &[&str],
    ) -> Result<&mut Self, RouterError> {
        if handler_name.trim().is_empty() {
            return Err(RouterError::invalid_route(pattern, "empty handler name"));
        }
        let parsed = Pattern::parse(pattern)?;
        let middleware = self.resolve_middleware(middleware.iter().copied())?;
        self.insert_route(
            parsed,
            HandlerRef::Named(Arc::from(handler_name)),
            methods,
            middleware,
        );
        Ok(self)
    }

    /// `GET` shortcut for [`add_route_with`](Self::add_route_with).
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition` if the pattern is malformed.
    pub fn get<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        self.add_route_with(pattern, handler, MethodSet::single(Method::GET), Vec::new())
    }

    /// `POST` shortcut.
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition` if the pattern is malformed.
    pub fn post<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        self.add_route_with(pattern, handler, MethodSet::single(Method::POST), Vec::new())
    }

    /// `PUT` shortcut.
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition` if the pattern is malformed.
    pub fn put<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        self.add_route_with(pattern, handler, MethodSet::single(Method::PUT), Vec::new())
    }

    /// `DELETE` shortcut.
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition` if the pattern is malformed.
    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        self.add_route_with(pattern, handler, MethodSet::single(Method::DELETE), Vec::new())
    }

    /// `PATCH` shortcut.
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition` if the pattern is malformed.
    pub fn patch<F>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&RouteParams) -> HandlerResponse + Send + Sync + 'static,
    {
        self.add_route_with(pattern, handler, MethodSet::single(Method::PATCH), Vec::new())
    }

    fn insert_route(
        &mut self,
        pattern: Pattern,
        handler: HandlerRef,
        methods: MethodSet,
        middleware: Vec<Arc<dyn Middleware>>,
    ) {
        let pattern = if self.config.case_sensitive {
            pattern
        } else {
            pattern.fold_case()
        };

        warn_unreachable_parts(&pattern);

        let route = Route {
            pattern: pattern.raw(),
            handler,
            methods,
            middleware,
        };

        info!(
            pattern = %pattern,
            methods = %route.methods,
            handler_name = route.handler.name().unwrap_or(BOUND_HANDLER),
            route_middleware = route.middleware.len(),
            "Route registered"
        );

        for displaced in self.tree.insert(&pattern, route) {
            warn!(
                pattern = %pattern,
                previous = %displaced.previous,
                replacement = %displaced.replacement,
                "Parameter marker replaced; routes below this position now capture under the new name"
            );
        }
    }

    /// Replace the whole tree with a pre-built one.
    pub fn set_routes(&mut self, tree: RouteTree) -> &mut Self {
        info!(routes_count = tree.len(), "Route tree replaced");
        self.tree = tree;
        self
    }

    /// Replace the whole tree from the tagged node form:
    ///
    /// ```json
    /// {"children": {"users": {"param": "id", "children": {
    ///     "show": {"route": {"handler": "show_user", "methods": ["GET"],
    ///                        "middleware": ["audit"]}}}}}}
    /// ```
    ///
    /// Handlers are registry names resolved at dispatch; middleware names are
    /// resolved now. On error the current tree is left untouched.
    ///
    /// # Errors
    ///
    /// `InvalidRoutesFormat` if `value` is not an object in that form,
    /// `InvalidRouteDefinition` / `InvalidMiddleware` for bad entries.
    pub fn set_routes_value(&mut self, value: &serde_json::Value) -> Result<&mut Self, RouterError> {
        let tree = import::build_tree(value, self)?;
        Ok(self.set_routes(tree))
    }

    /// Every registered route as `(pattern, methods)`, sorted by pattern.
    #[must_use]
    pub fn route_patterns(&self) -> Vec<(String, MethodSet)> {
        self.tree.describe()
    }

    /// Normalise `path` the way dispatch does and look it up, without running
    /// any middleware or handler.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<RouteMatch<'_>> {
        let normalized = self.normalize(path);
        let segments = split_segments(&normalized);
        if segments.is_empty() {
            return None;
        }
        self.tree.find(&segments[..])
    }

    fn normalize<'p>(&self, path: &'p str) -> Cow<'p, str> {
        if self.config.case_sensitive {
            Cow::Borrowed(path)
        } else {
            Cow::Owned(path.to_lowercase())
        }
    }

    // ---------------------------------------------------------------------
    // Dispatch
    // ---------------------------------------------------------------------

    /// Handle one request with a freshly minted request id.
    ///
    /// # Errors
    ///
    /// `RoutingNotConfigured` if the router has no routes. Every other
    /// condition is reported through [`Dispatch::outcome`].
    pub fn handle_request(&self, method: &Method, path: &str) -> Result<Dispatch, RouterError> {
        self.handle_request_with_id(method, path, RequestId::new())
    }

    /// Handle one request, correlating it with a transport-supplied id.
    ///
    /// Runs: prefix chain → segmentation → (default | fallback | match) →
    /// suffix chain → handler resolution → method check → route chain →
    /// handler.
    ///
    /// # Errors
    ///
    /// `RoutingNotConfigured` if the router has no routes.
    pub fn handle_request_with_id(
        &self,
        method: &Method,
        path: &str,
        request_id: RequestId,
    ) -> Result<Dispatch, RouterError> {
        if self.tree.is_empty() {
            error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                "Request received before any route was registered"
            );
            return Err(RouterError::RoutingNotConfigured);
        }

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %path
        );
        let _entered = span.enter();

        let mut ctx = RequestContext {
            request_id,
            method: method.clone(),
            path: path.to_string(),
            stage: Stage::Prefix,
        };
        run_chain(&self.prefix_units, &ctx);

        let normalized = self.normalize(path);
        let segments = split_segments(&normalized);

        if segments.is_empty() {
            return Ok(match &self.default_handler {
                Some(default) => {
                    debug!(request_id = %request_id, "Empty path, default handler");
                    Dispatch {
                        request_id,
                        outcome: Outcome::Default,
                        response: Some(default(&RouteParams::new())),
                    }
                }
                None => {
                    debug!(request_id = %request_id, "Empty path, no default handler set");
                    Dispatch {
                        request_id,
                        outcome: Outcome::NoPath,
                        response: Some(HandlerResponse::html(200, NO_PATH_BODY)),
                    }
                }
            });
        }

        debug!(
            request_id = %request_id,
            segments = ?segments,
            "Route match attempt"
        );

        let Some(matched) = self.tree.find(&segments[..]) else {
            warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                fallback = self.fallback.is_some(),
                "No route matched"
            );
            return Ok(match &self.fallback {
                Some(fallback) => Dispatch {
                    request_id,
                    outcome: Outcome::Fallback,
                    response: Some(fallback(&RouteParams::new())),
                },
                None => Dispatch {
                    request_id,
                    outcome: Outcome::Unmatched,
                    response: None,
                },
            });
        };

        let route = matched.route;
        info!(
            request_id = %request_id,
            route_pattern = %route.pattern,
            path_params = ?matched.params,
            "Route matched"
        );

        ctx.stage = Stage::Suffix;
        run_chain(&self.suffix_units, &ctx);

        let Some(handler) = route.handler.resolve(&self.registry) else {
            error!(
                request_id = %request_id,
                route_pattern = %route.pattern,
                handler_name = route.handler.name().unwrap_or(BOUND_HANDLER),
                "Route handler is not registered"
            );
            let response = self
                .page_error
                .as_ref()
                .or(self.fallback.as_ref())
                .map_or_else(
                    || HandlerResponse::html(500, PAGE_ERROR_BODY),
                    |h| h(&RouteParams::new()),
                );
            return Ok(Dispatch {
                request_id,
                outcome: Outcome::PageError,
                response: Some(response),
            });
        };

        // The suffix chain has already run for this match; a 405 skips only
        // the route chain and the handler.
        if !route.methods.contains(method) {
            warn!(
                request_id = %request_id,
                method = %method,
                route_pattern = %route.pattern,
                allowed = %route.methods,
                "Method not allowed"
            );
            let mut response = HandlerResponse::text(405, METHOD_NOT_ALLOWED_BODY);
            response.set_header("allow", route.methods.allow_header());
            return Ok(Dispatch {
                request_id,
                outcome: Outcome::MethodNotAllowed,
                response: Some(response),
            });
        }

        ctx.stage = Stage::Route;
        run_chain(&route.middleware, &ctx);

        let response = handler(&matched.params);
        debug!(
            request_id = %request_id,
            status = response.status,
            "Handler complete"
        );

        Ok(Dispatch {
            request_id,
            outcome: Outcome::Handled,
            response: Some(response),
        })
    }
}

/// Log route parts that registration accepts but matching can never reach.
pub(super) fn warn_unreachable_parts(pattern: &Pattern) {
    if pattern.tokens().is_empty() {
        warn!(
            pattern = %pattern,
            "Route attached to the root is never matched; empty paths go to the default handler"
        );
    }
    if pattern.has_trailing_param() {
        warn!(
            pattern = %pattern,
            "Trailing parameter has no literal after it; the route's handler will not see it"
        );
    }
    for name in pattern.unanchored_params() {
        warn!(
            pattern = %pattern,
            param = %name,
            "Parameter has no literal before it and can never capture"
        );
    }
}

fn run_chain(units: &[Arc<dyn Middleware>], ctx: &RequestContext) {
    for unit in units {
        unit.call(ctx);
    }
}

fn split_segments(path: &str) -> SmallVec<[&str; MAX_INLINE_SEGMENTS]> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
