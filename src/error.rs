use std::fmt;

/// Errors raised while wiring a [`Router`](crate::router::Router) or when a
/// request reaches a router that was never configured.
///
/// Route mismatches, handler defects and disallowed methods are not errors at
/// this level: they are recovered inside dispatch and reported through
/// [`Outcome`](crate::dispatcher::Outcome).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// `handle_request` was called before any route was registered.
    RoutingNotConfigured,
    /// A route pattern or handler reference cannot be registered.
    ///
    /// Raised for an empty parameter name (`{}`), unbalanced braces, a brace
    /// inside a literal segment, or an empty handler name.
    InvalidRouteDefinition {
        /// The pattern as supplied by the caller
        pattern: String,
        /// What is wrong with it
        reason: String,
    },
    /// A middleware name does not resolve to a registered unit.
    InvalidMiddleware {
        /// The unresolved middleware name
        name: String,
    },
    /// A fallback, default or page-error handler name does not resolve.
    InvalidArgumentKind {
        /// Which slot was being set (`fallback`, `default`, `page_error`)
        slot: &'static str,
        /// The unresolved handler name
        name: String,
    },
    /// A bulk route import was not in the tagged tree format.
    InvalidRoutesFormat {
        /// Parser or shape diagnostic
        detail: String,
    },
}

impl RouterError {
    pub(crate) fn invalid_route(pattern: &str, reason: impl Into<String>) -> Self {
        RouterError::InvalidRouteDefinition {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::RoutingNotConfigured => {
                write!(
                    f,
                    "No routes defined. Register routes with add_route() or set_routes() first."
                )
            }
            RouterError::InvalidRouteDefinition { pattern, reason } => {
                write!(f, "Invalid route definition '{}': {}", pattern, reason)
            }
            RouterError::InvalidMiddleware { name } => {
                write!(
                    f,
                    "Middleware '{}' is not registered. Register it before referencing it by name.",
                    name
                )
            }
            RouterError::InvalidArgumentKind { slot, name } => {
                write!(
                    f,
                    "Cannot set {} handler: '{}' is not a registered handler",
                    slot, name
                )
            }
            RouterError::InvalidRoutesFormat { detail } => {
                write!(f, "Routes provided are not in tree format: {}", detail)
            }
        }
    }
}

impl std::error::Error for RouterError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_offending_value() {
        let err = RouterError::invalid_route("/users/{", "unclosed parameter");
        assert_eq!(
            err.to_string(),
            "Invalid route definition '/users/{': unclosed parameter"
        );

        let err = RouterError::InvalidArgumentKind {
            slot: "fallback",
            name: "missing".into(),
        };
        assert!(err.to_string().contains("fallback"));
        assert!(err.to_string().contains("missing"));
    }
}
