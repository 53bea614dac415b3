//! # segrouter
//!
//! **segrouter** is a segment-keyed URL router: register path patterns such as
//! `/users/{id}/show` against handlers, then run each request through a fixed
//! dispatch state machine with global and per-route middleware chains.
//!
//! ## Architecture
//!
//! - **[`router`]** - Pattern parsing, the route tree and the [`Router`] façade
//! - **[`dispatcher`]** - Handler, response and dispatch-result types plus the
//!   [`HandlerRegistry`] for name-based wiring
//! - **[`middleware`]** - The [`Middleware`] trait and built-in units
//! - **[`table`]** - Route tables loaded from YAML or JSON files
//! - **[`runtime_config`]** - Router configuration from the environment
//! - **[`logging`]** - `tracing-subscriber` setup for binaries
//! - **[`cli`]** - The `segrouter` command-line tool
//!
//! ## Request Flow
//!
//! ```text
//! START ─▶ prefix chain ─▶ segment path
//!            ├─ no segments ──▶ default handler | built-in page
//!            ├─ no match ─────▶ fallback | unmatched
//!            └─ match ─▶ suffix chain ─▶ resolve handler ─▶ method check
//!                                           │                  │
//!                                      page error            405
//!                                                              └─▶ route chain ─▶ handler
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use segrouter::{HandlerResponse, Outcome, Router};
//!
//! let mut router = Router::new();
//! router
//!     .add_route("/users/{id}/show", |params| {
//!         HandlerResponse::text(200, params.get("id").unwrap_or("none").to_string())
//!     })
//!     .unwrap();
//! router.set_fallback(|_| HandlerResponse::text(404, "not found"));
//!
//! let hit = router.handle_request(&Method::GET, "/users/7/show").unwrap();
//! assert_eq!(hit.outcome, Outcome::Handled);
//! assert_eq!(hit.response.unwrap().body, "7");
//!
//! let miss = router.handle_request(&Method::GET, "/users/7/edit").unwrap();
//! assert_eq!(miss.outcome, Outcome::Fallback);
//! ```

pub mod cli;
pub mod dispatcher;
mod echo;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod table;

pub use dispatcher::{
    Dispatch, Handler, HandlerRef, HandlerRegistry, HandlerResponse, Outcome, RouteParams,
};
pub use echo::echo_handler;
pub use error::RouterError;
pub use ids::RequestId;
pub use middleware::{Middleware, RequestContext, Stage};
pub use router::{MethodSet, RouteTree, Router};
pub use runtime_config::RouterConfig;
pub use table::{RouteEntry, RouteTable};
