use std::fmt;
use std::sync::Arc;

use http::Method;

use crate::ids::RequestId;

/// Which chain a unit is being run from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Global prefix chain, before any path inspection
    Prefix,
    /// Global suffix chain, after a successful match
    Suffix,
    /// Route-specific chain, after suffixes and before the handler
    Route,
}

impl Stage {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Prefix => "prefix",
            Stage::Suffix => "suffix",
            Stage::Route => "route",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of the request handed to every middleware unit.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: RequestId,
    pub method: Method,
    /// Path exactly as received from the transport
    pub path: String,
    pub stage: Stage,
}

/// A unit in the prefix, suffix or route-specific chain.
///
/// Units observe the request; they cannot short-circuit it. Every registered
/// unit of a chain runs, in registration order, whenever that chain runs.
pub trait Middleware: Send + Sync {
    fn call(&self, ctx: &RequestContext);
}

impl<F> Middleware for F
where
    F: Fn(&RequestContext) + Send + Sync,
{
    fn call(&self, ctx: &RequestContext) {
        self(ctx)
    }
}

/// Wrap a closure as a shareable middleware unit.
pub fn from_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(&RequestContext) + Send + Sync + 'static,
{
    Arc::new(f)
}
