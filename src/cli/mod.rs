//! # CLI Module
//!
//! The `segrouter` binary works on route tables (see [`crate::table`]).
//!
//! ## Commands
//!
//! ### `routes`
//!
//! List every registered pattern with its methods, plus patterns whose last
//! token is a parameter:
//!
//! ```bash
//! segrouter routes --table routes.yaml
//! ```
//!
//! ### `match`
//!
//! Dispatch a single request with echo handlers bound to every name and print
//! the outcome and response as JSON:
//!
//! ```bash
//! segrouter match --table routes.yaml --method POST /users/42/show
//! ```

mod commands;


pub use commands::{build_echo_router, execute, run_cli, Cli, Commands};
