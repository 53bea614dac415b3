use tracing::debug;

use super::{Middleware, RequestContext};

/// Emits one debug event per chain pass, tagged with the stage.
///
/// Register it as a prefix unit to see every request, or as a suffix unit to
/// see only matched ones.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn call(&self, ctx: &RequestContext) {
        debug!(
            request_id = %ctx.request_id,
            method = %ctx.method,
            path = %ctx.path,
            stage = %ctx.stage,
            "Middleware pass"
        );
    }
}
