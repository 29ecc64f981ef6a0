//! Route configuration checks
//!
//! Applied to the initial routes and to every lazily loaded batch before it
//! enters the tree. When [`RouterConfig::validate_routes`](crate::RouterConfig)
//! is off (the release-build default) validation is a no-op.
//!
//! # Rules
//!
//! - dynamic segment names are non-empty identifiers (`[A-Za-z0-9_]`)
//! - a param name is bound at most once along any root-to-leaf chain
//! - `any` routes have no children and no loader
//! - a route may not declare both static children and a loader
//! - explicit keys are unique within a batch

use std::collections::HashSet;
use thiserror::Error;

use crate::tree::{MatchMode, RouteConfig};
use crate::{RouterError, RouterResult};

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("route '{route}': {message}")]
pub struct ValidationError {
    /// Slash-joined patterns from the batch root to the offending route
    pub route: String,
    /// What is wrong
    pub message: String,
}

impl ValidationError {
    fn new(route: &str, message: impl Into<String>) -> Self {
        Self {
            route: route.to_string(),
            message: message.into(),
        }
    }
}

/// Route validator that can be switched off.
#[derive(Debug, Clone, Copy)]
pub struct RouteValidator {
    enabled: bool,
}

impl RouteValidator {
    /// Create a validator.
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Returns true if checks run.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check a batch of routes whose ancestors already bind `inherited_params`.
    pub fn validate(&self, routes: &[RouteConfig], inherited_params: &[String]) -> RouterResult<()> {
        if !self.enabled {
            return Ok(());
        }

        let errors = validate_routes(routes, inherited_params);
        if errors.is_empty() {
            return Ok(());
        }

        tracing::warn!(errors = errors.len(), "route configuration rejected");
        let cause = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(RouterError::invalid_config("Invalid route configuration").with_cause(cause))
    }
}

/// Collect every rule violation in `routes`.
pub fn validate_routes(routes: &[RouteConfig], inherited_params: &[String]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut keys = HashSet::new();
    let inherited: Vec<&str> = inherited_params.iter().map(String::as_str).collect();
    for route in routes {
        check(route, "", &inherited, &mut keys, &mut errors);
    }
    errors
}

fn check<'a>(
    route: &'a RouteConfig,
    prefix: &str,
    inherited: &[&'a str],
    keys: &mut HashSet<&'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let label = if prefix.is_empty() {
        route.path.clone()
    } else {
        format!("{}/{}", prefix, route.path)
    };

    let mut bound: Vec<&'a str> = inherited.to_vec();
    for name in route
        .path
        .split('/')
        .filter_map(|segment| segment.strip_prefix(':'))
    {
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            errors.push(ValidationError::new(&label, format!("invalid param name ':{}'", name)));
        } else if bound.contains(&name) {
            errors.push(ValidationError::new(&label, format!("param ':{}' is already bound", name)));
        } else {
            bound.push(name);
        }
    }

    if route.match_mode == MatchMode::Any && (!route.children.is_empty() || route.load_children.is_some()) {
        errors.push(ValidationError::new(&label, "'any' routes cannot have children"));
    }

    if !route.children.is_empty() && route.load_children.is_some() {
        errors.push(ValidationError::new(&label, "routes cannot have both children and a loader"));
    }

    if let Some(key) = &route.key {
        if !keys.insert(key.as_str()) {
            errors.push(ValidationError::new(&label, format!("duplicate key '{}'", key)));
        }
    }

    for child in &route.children {
        check(child, &label, &bound, keys, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_routes_pass() {
        let routes = vec![
            RouteConfig::new("").full(),
            RouteConfig::new("shows/:id").children([RouteConfig::new("edit").full()]),
            RouteConfig::new("").any(),
        ];
        assert!(validate_routes(&routes, &[]).is_empty());
    }

    #[test]
    fn test_duplicate_params_along_chain() {
        let routes = vec![RouteConfig::new(":id").children([RouteConfig::new("x/:id")])];
        let errors = validate_routes(&routes, &[]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].route, ":id/x/:id");

        let errors = validate_routes(&[RouteConfig::new(":id")], &["id".to_string()]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_siblings_may_reuse_params() {
        let routes = vec![RouteConfig::new("a/:id"), RouteConfig::new("b/:id")];
        assert!(validate_routes(&routes, &[]).is_empty());
    }

    #[test]
    fn test_structural_rules() {
        let routes = vec![
            RouteConfig::new("").any().children([RouteConfig::new("x")]),
            RouteConfig::new(":").key("k"),
            RouteConfig::new("lazy")
                .key("k")
                .children([RouteConfig::new("y")])
                .load_children(|| async { Ok(vec![]) }),
        ];
        let messages: Vec<String> = validate_routes(&routes, &[])
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages.len(), 4);
        assert!(messages.iter().any(|m| m.contains("'any'")));
        assert!(messages.iter().any(|m| m.contains("invalid param")));
        assert!(messages.iter().any(|m| m.contains("both children and a loader")));
        assert!(messages.iter().any(|m| m.contains("duplicate key")));
    }

    #[test]
    fn test_disabled_validator_is_noop() {
        let routes = vec![RouteConfig::new(":")];
        assert!(RouteValidator::new(false).validate(&routes, &[]).is_ok());

        let err = RouteValidator::new(true).validate(&routes, &[]).unwrap_err();
        assert_eq!(err.code, crate::RouterErrorCode::InvalidConfig);
        assert!(err.cause.unwrap().contains("invalid param"));
    }
}
