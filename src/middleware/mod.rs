//! Middleware units run by the router at three points of a request:
//! the global prefix chain, the global suffix chain and a route's own chain.
//!
//! Units observe a [`RequestContext`]; they cannot stop the request.

mod core;
mod metrics;
mod trace;

pub use core::{from_fn, Middleware, RequestContext, Stage};
pub use metrics::MetricsMiddleware;
pub use trace::TracingMiddleware;
