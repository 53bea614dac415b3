use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Middleware, RequestContext, Stage};

/// Counts chain passes per stage.
///
/// All counters use relaxed atomics; the middleware only observes.
///
/// Registered as a prefix unit, [`request_count`](Self::request_count) is the
/// number of requests the router has seen. Registered as a suffix unit,
/// [`matched_count`](Self::matched_count) is the number of requests that
/// matched a route. The same instance can be shared between both chains.
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    prefix_passes: AtomicUsize,
    suffix_passes: AtomicUsize,
    route_passes: AtomicUsize,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of prefix-chain passes
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.prefix_passes.load(Ordering::Relaxed)
    }

    /// Number of suffix-chain passes
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.suffix_passes.load(Ordering::Relaxed)
    }

    /// Number of route-chain passes
    #[must_use]
    pub fn route_middleware_count(&self) -> usize {
        self.route_passes.load(Ordering::Relaxed)
    }
}

impl Middleware for MetricsMiddleware {
    fn call(&self, ctx: &RequestContext) {
        let counter = match ctx.stage {
            Stage::Prefix => &self.prefix_passes,
            Stage::Suffix => &self.suffix_passes,
            Stage::Route => &self.route_passes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
