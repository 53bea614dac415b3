use serde_json::json;

use crate::dispatcher::{handler_fn, Handler, HandlerResponse};

/// Handler that answers 200 with its own name and the parameters it saw.
///
/// Used by the CLI to bind every name in a route table, and handy in tests.
#[must_use]
pub fn echo_handler(name: &str) -> Handler {
    let name = name.to_string();
    handler_fn(move |params| {
        HandlerResponse::json(
            200,
            &json!({
                "handler": name,
                "params": params.to_map(),
            }),
        )
    })
}
