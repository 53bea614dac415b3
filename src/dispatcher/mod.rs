//! # Dispatcher Module
//!
//! Types that flow between the router and application code during dispatch.
//!
//! ## Overview
//!
//! - [`Handler`] is the one callable shape used for route handlers, the
//!   fallback, the default handler and the page-error handler. It receives the
//!   captured [`RouteParams`] and returns a [`HandlerResponse`].
//! - [`HandlerRegistry`] maps names to handlers and middleware so routes can be
//!   declared in data (route tables, tagged tree imports) and bound later.
//! - [`HandlerRef`] is how a terminal route points at its handler: either a
//!   closure bound at registration or a name resolved at dispatch time.
//! - [`Dispatch`] and [`Outcome`] describe which terminal state a request
//!   reached and what the transport should write.
//!
//! ## Handler Registration
//!
//! ```rust
//! use segrouter::dispatcher::{HandlerRegistry, HandlerResponse};
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register_handler("show_user", |params| {
//!     HandlerResponse::text(200, format!("user {}", params.get("id").unwrap_or("?")))
//! });
//! assert!(registry.contains_handler("show_user"));
//! ```

mod core;

pub use core::{
    handler_fn, Dispatch, Handler, HandlerRef, HandlerRegistry, HandlerResponse, HeaderVec,
    Outcome, ParamVec, RouteParams, MAX_INLINE_HEADERS, MAX_INLINE_PARAMS,
};
