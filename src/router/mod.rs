//! # Router Module
//!
//! Path routing for segment-keyed route trees.
//!
//! ## Overview
//!
//! - [`Pattern`] parses registration strings such as `/users/{id}/show`.
//! - [`RouteTree`] stores routes keyed by literal segment; a `{name}` token
//!   marks the node before it so the next request segment is captured.
//! - [`Router`] owns the tree, the global middleware chains and the special
//!   handlers, and runs every request through the dispatch state machine.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use segrouter::dispatcher::{HandlerResponse, Outcome};
//! use segrouter::router::Router;
//!
//! let mut router = Router::new();
//! router
//!     .add_route("/users/{id}/show", |params| {
//!         HandlerResponse::text(200, format!("user {}", params.get("id").unwrap_or("?")))
//!     })
//!     .unwrap();
//!
//! let dispatch = router.handle_request(&Method::GET, "/users/42/show").unwrap();
//! assert_eq!(dispatch.outcome, Outcome::Handled);
//! assert_eq!(dispatch.response.unwrap().body, "user 42");
//! ```

mod core;
mod import;
mod route;
mod tree;


pub use core::{Router, METHOD_NOT_ALLOWED_BODY, NO_PATH_BODY, PAGE_ERROR_BODY};
pub use route::{MethodSet, Pattern, Route, Token};
pub use tree::{Displaced, RouteMatch, RouteNode, RouteTree};
