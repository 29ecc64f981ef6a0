//! Error types for navigation operations
//!
//! Every failure surfaced by the router carries a [`RouterErrorCode`] so
//! callers can branch on the category without string matching.
//!
//! # Error Codes
//!
//! Codes serialize to SCREAMING_SNAKE_CASE strings (e.g. `NotFound` becomes
//! `"NOT_FOUND"`), which keeps them stable when forwarded to observers.
//!
//! # Example
//! ```rust,ignore
//! use little_router::{RouterError, RouterErrorCode};
//!
//! let error = RouterError::new(RouterErrorCode::Middleware, "auth guard failed");
//! let error = RouterError::middleware("auth guard failed"); // Convenience method
//! ```
//!
//! Redirects are not errors: a guard or middleware that wants to navigate
//! elsewhere returns [`Outcome::Redirect`](crate::Outcome::Redirect).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::tree::MatchResult;

/// Type-safe error codes for navigation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum RouterErrorCode {
    /// No route matched the requested path
    NotFound,
    /// A middleware or guard step failed
    Middleware,
    /// A tree mutation targeted a node missing from the identity cache
    NodeNotFound,
    /// A route configuration (or router configuration) is malformed
    InvalidConfig,
    /// A lazy children loader failed
    LoaderFailed,
    /// The router has not been started
    NotStarted,
    /// An unexpected internal error occurred
    Internal,
}

impl RouterErrorCode {
    /// Returns the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Middleware => "MIDDLEWARE",
            Self::NodeNotFound => "NODE_NOT_FOUND",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::LoaderFailed => "LOADER_FAILED",
            Self::NotStarted => "NOT_STARTED",
            Self::Internal => "INTERNAL",
        }
    }

    /// Returns true for errors caused by the caller's input or configuration.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::NodeNotFound | Self::InvalidConfig | Self::NotStarted
        )
    }
}

impl fmt::Display for RouterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Navigation error with a type-safe code and message.
///
/// A `NotFound` error carries the deepest partial match chain found while
/// resolving, so a caller can render a "not found" view nested under the
/// deepest resolved ancestor.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct RouterError {
    /// Type-safe error code
    pub code: RouterErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional cause for debugging
    pub cause: Option<String>,
    /// Deepest partial match chain (only populated for `NotFound`)
    pub matched: Vec<MatchResult>,
}

impl RouterError {
    /// Create a new error with code and message.
    pub fn new(code: RouterErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            matched: Vec::new(),
        }
    }

    /// Add a cause string for debugging.
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attach the partial match chain found before resolution failed.
    pub fn with_matched(mut self, matched: Vec<MatchResult>) -> Self {
        self.matched = matched;
        self
    }

    /// Returns true if no route matched.
    pub fn is_not_found(&self) -> bool {
        self.code == RouterErrorCode::NotFound
    }

    // Convenience constructors

    /// Create a NOT_FOUND error for a path.
    pub fn not_found(path: &str) -> Self {
        Self::new(
            RouterErrorCode::NotFound,
            format!("No route matched '{}'", path),
        )
    }

    /// Create a MIDDLEWARE error.
    pub fn middleware(message: impl Into<String>) -> Self {
        Self::new(RouterErrorCode::Middleware, message)
    }

    /// Create a NODE_NOT_FOUND error for a node key.
    pub fn node_not_found(key: impl fmt::Display) -> Self {
        Self::new(
            RouterErrorCode::NodeNotFound,
            format!("Node not found: {}", key),
        )
    }

    /// Create an INVALID_CONFIG error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(RouterErrorCode::InvalidConfig, message)
    }

    /// Create a LOADER_FAILED error.
    pub fn loader_failed(message: impl Into<String>) -> Self {
        Self::new(RouterErrorCode::LoaderFailed, message)
    }

    /// Create a NOT_STARTED error.
    pub fn not_started() -> Self {
        Self::new(RouterErrorCode::NotStarted, "Router has not been started")
    }

    /// Create an INTERNAL error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(RouterErrorCode::Internal, message)
    }
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_config(format!("JSON error: {}", err))
    }
}

impl From<crate::config::ConfigValidationError> for RouterError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        Self::invalid_config(err.to_string())
    }
}

/// Result type alias for navigation operations.
pub type RouterResult<T> = Result<T, RouterError>;
