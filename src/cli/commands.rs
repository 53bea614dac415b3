use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::json;

use crate::dispatcher::HandlerRegistry;
use crate::echo::echo_handler;
use crate::ids::RequestId;
use crate::middleware::TracingMiddleware;
use crate::router::Router;
use crate::table::RouteTable;

/// Command-line interface for segrouter
///
/// Inspects route tables and dry-runs requests against them.
#[derive(Parser, Debug)]
#[command(name = "segrouter")]
#[command(about = "Segment router CLI", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every route of a route table
    Routes {
        /// Route table file (YAML or JSON)
        #[arg(short, long)]
        table: PathBuf,
    },
    /// Dispatch one request against a route table and print the outcome
    ///
    /// Every handler named in the table is bound to an echo handler and every
    /// middleware name to a tracing unit.
    Match {
        /// Route table file (YAML or JSON)
        #[arg(short, long)]
        table: PathBuf,

        /// HTTP method of the request
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request id to correlate with (ULID); a new one is minted otherwise
        #[arg(long)]
        request_id: Option<String>,

        /// Request path, e.g. /users/42/show
        path: String,
    },
}

/// Parse the process arguments and run the command, writing to stdout.
///
/// # Errors
///
/// Returns an error if the table cannot be loaded or built, the method is not
/// a valid HTTP method, or the router has no routes.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&cli, &mut out)
}

/// Run a parsed command, writing its JSON output to `out`.
///
/// # Errors
///
/// See [`run_cli`].
pub fn execute<W: Write>(cli: &Cli, out: &mut W) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Routes { table } => {
            let table = RouteTable::from_path(table)?;
            let router = build_echo_router(&table)?;
            let routes: Vec<_> = router
                .route_patterns()
                .into_iter()
                .map(|(pattern, methods)| {
                    json!({
                        "pattern": pattern,
                        "methods": methods.iter().map(Method::as_str).collect::<Vec<_>>(),
                    })
                })
                .collect();
            let trailing = router.tree().trailing_param_patterns();
            serde_json::to_writer_pretty(
                &mut *out,
                &json!({ "routes": routes, "trailing_param_routes": trailing }),
            )?;
            writeln!(out)?;
            Ok(())
        }
        Commands::Match {
            table,
            method,
            request_id,
            path,
        } => {
            let method = Method::from_bytes(method.as_bytes())
                .with_context(|| format!("invalid HTTP method '{method}'"))?;
            let table = RouteTable::from_path(table)?;
            let router = build_echo_router(&table)?;
            let request_id = RequestId::from_header_or_new(request_id.as_deref());

            let dispatch = router.handle_request_with_id(&method, path, request_id)?;
            let response = dispatch.response.as_ref().map(|r| {
                let headers: serde_json::Map<String, serde_json::Value> = r
                    .headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), json!(v)))
                    .collect();
                json!({ "status": r.status, "headers": headers, "body": r.body })
            });
            serde_json::to_writer_pretty(
                &mut *out,
                &json!({
                    "request_id": dispatch.request_id.to_string(),
                    "outcome": dispatch.outcome.as_str(),
                    "response": response,
                }),
            )?;
            writeln!(out)?;
            Ok(())
        }
    }
}

/// Build a router from `table` with every referenced name bound.
pub fn build_echo_router(table: &RouteTable) -> anyhow::Result<Router> {
    let mut registry = HandlerRegistry::new();
    for name in table.handler_names() {
        registry.insert_handler(&name, echo_handler(&name));
    }
    for name in table.middleware_names() {
        registry.register_middleware(&name, Arc::new(TracingMiddleware));
    }
    table
        .build(registry)
        .context("route table does not describe a valid router")
}
