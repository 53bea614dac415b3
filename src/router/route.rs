//! Route patterns, method sets and terminal route definitions.

use std::fmt;
use std::sync::Arc;

use http::Method;
use smallvec::SmallVec;

use crate::dispatcher::HandlerRef;
use crate::error::RouterError;
use crate::middleware::Middleware;

/// One token of a registered path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Matched by exact string equality
    Literal(String),
    /// `{name}`: marks the current tree position with a parameter name
    Param(Arc<str>),
}

/// A parsed path pattern such as `/users/{id}/show`.
///
/// Empty segments are dropped, so `/users//{id}/show/` parses the same as
/// `users/{id}/show`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    raw: Arc<str>,
    tokens: Vec<Token>,
}

impl Pattern {
    /// Parse a pattern string.
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition` for `{}`, a parameter token with extra braces,
    /// or a brace inside a literal segment.
    pub fn parse(pattern: &str) -> Result<Self, RouterError> {
        let mut tokens = Vec::new();
        for segment in pattern.split('/').filter(|s| !s.is_empty()) {
            tokens.push(parse_token(pattern, segment)?);
        }
        Ok(Self {
            raw: Arc::from(pattern),
            tokens,
        })
    }

    /// Build a pattern from already-split tokens (`"users"`, `"{id}"`, ...).
    ///
    /// # Errors
    ///
    /// Same as [`parse`](Self::parse); a token containing `/` is also rejected.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, RouterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let segments: Vec<S> = segments.into_iter().collect();
        let raw = segments
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join("/");
        let raw = format!("/{raw}");
        let mut tokens = Vec::with_capacity(segments.len());
        for segment in &segments {
            let segment = segment.as_ref();
            if segment.is_empty() || segment.contains('/') {
                return Err(RouterError::invalid_route(
                    &raw,
                    format!("segment '{segment}' must be non-empty and contain no '/'"),
                ));
            }
            tokens.push(parse_token(&raw, segment)?);
        }
        Ok(Self {
            raw: Arc::from(raw),
            tokens,
        })
    }

    /// Lower-case every literal token. Parameter names keep their case.
    #[must_use]
    pub fn fold_case(mut self) -> Self {
        for token in &mut self.tokens {
            if let Token::Literal(lit) = token {
                *lit = lit.to_lowercase();
            }
        }
        self
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// True when the last token is a parameter.
    ///
    /// Such a parameter has no literal after it to anchor on; the route is
    /// reachable but what it captures is not well defined.
    #[must_use]
    pub fn has_trailing_param(&self) -> bool {
        matches!(self.tokens.last(), Some(Token::Param(_)))
    }

    /// Parameters that cannot capture anything: a parameter before the first
    /// literal (it lands on the root, which matching never consults) and any
    /// parameter directly following another one (it replaces the earlier
    /// marker on the same node).
    #[must_use]
    pub fn unanchored_params(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut prev_literal = false;
        for token in &self.tokens {
            match token {
                Token::Literal(_) => prev_literal = true,
                Token::Param(name) => {
                    if !prev_literal {
                        out.push(name.as_ref());
                    }
                    prev_literal = false;
                }
            }
        }
        out
    }

    pub(crate) fn raw(&self) -> Arc<str> {
        Arc::clone(&self.raw)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_token(pattern: &str, segment: &str) -> Result<Token, RouterError> {
    if let Some(inner) = segment
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        if inner.is_empty() {
            return Err(RouterError::invalid_route(pattern, "empty parameter name"));
        }
        if inner.contains('{') || inner.contains('}') {
            return Err(RouterError::invalid_route(
                pattern,
                format!("malformed parameter token '{segment}'"),
            ));
        }
        return Ok(Token::Param(Arc::from(inner)));
    }
    if segment.contains('{') || segment.contains('}') {
        return Err(RouterError::invalid_route(
            pattern,
            format!("unbalanced brace in segment '{segment}'"),
        ));
    }
    Ok(Token::Literal(segment.to_string()))
}

/// Allowed HTTP methods of a route.
///
/// Comparison is exact: `http::Method` keeps non-standard spellings such as
/// `get` distinct from `GET`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSet {
    methods: SmallVec<[Method; 4]>,
}

impl MethodSet {
    /// Build a set; an empty input yields `{GET}`.
    pub fn new<I>(methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        let mut set: SmallVec<[Method; 4]> = SmallVec::new();
        for m in methods {
            if !set.contains(&m) {
                set.push(m);
            }
        }
        if set.is_empty() {
            set.push(Method::GET);
        }
        Self { methods: set }
    }

    #[must_use]
    pub fn single(method: Method) -> Self {
        Self::new([method])
    }

    /// Parse method names from configuration.
    ///
    /// # Errors
    ///
    /// `InvalidRouteDefinition` if a name is not a valid HTTP method token.
    pub fn parse<S: AsRef<str>>(pattern: &str, names: &[S]) -> Result<Self, RouterError> {
        let mut methods = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let method = Method::from_bytes(name.as_bytes()).map_err(|_| {
                RouterError::invalid_route(pattern, format!("invalid HTTP method '{name}'"))
            })?;
            methods.push(method);
        }
        Ok(Self::new(methods))
    }

    #[must_use]
    pub fn contains(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    /// Value for an `Allow` header
    #[must_use]
    pub fn allow_header(&self) -> String {
        self.methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for MethodSet {
    fn default() -> Self {
        Self::single(Method::GET)
    }
}

impl fmt::Display for MethodSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.allow_header())
    }
}

/// Terminal route definition attached to a tree node.
#[derive(Clone)]
pub struct Route {
    /// Pattern the route was registered with, for diagnostics
    pub pattern: Arc<str>,
    pub handler: HandlerRef,
    pub methods: MethodSet,
    /// Route-specific middleware, run after the global suffix chain
    pub middleware: Vec<Arc<dyn Middleware>>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("handler", &self.handler)
            .field("methods", &self.methods)
            .field("middleware", &self.middleware.len())
            .finish()
    }
}
