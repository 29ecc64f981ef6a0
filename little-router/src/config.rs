//! Configuration module for the router.
//!
//! This module provides the [`RouterConfig`] struct for customizing router behavior.
//!
//! # Example
//! ```rust,ignore
//! use little_router::RouterConfig;
//!
//! let config = RouterConfig::new()
//!     .with_validate_routes(true)
//!     .with_event_buffer(128)
//!     .with_debug_logging(true);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by [`RouterConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    /// The lifecycle event buffer must hold at least one event
    #[error("event_buffer must be greater than zero")]
    InvalidEventBuffer,
    /// The compiled matcher cache must hold at least one entry
    #[error("matcher_cache_size must be greater than zero")]
    InvalidMatcherCacheSize,
}

/// Router configuration.
///
/// All fields have defaults that work out of the box. Use
/// [`RouterConfig::default()`] to get the default configuration.
///
/// # Fields
///
/// * `validate_routes` - Check route configuration nodes before they enter the
///   tree. Defaults to on in debug builds and off in release builds, where the
///   check becomes a no-op.
///
/// * `event_buffer` - Capacity of the lifecycle event broadcast channel.
///   Slow observers lag (and skip events) rather than block navigation.
///   Default: 64 events.
///
/// * `matcher_cache_size` - Number of compiled path patterns kept in the LRU
///   matcher cache shared by every node in the tree. Default: 128.
///
/// * `debug_logging` - Log per-navigation lifecycle steps at `debug` instead of
///   `trace`. Default: false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Validate route configuration nodes (default: on in debug builds)
    pub validate_routes: bool,
    /// Lifecycle event channel capacity (default: 64)
    pub event_buffer: usize,
    /// Compiled matcher cache capacity (default: 128)
    pub matcher_cache_size: usize,
    /// Verbose lifecycle logging (default: false)
    pub debug_logging: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            validate_routes: cfg!(debug_assertions),
            event_buffer: 64,
            matcher_cache_size: 128,
            debug_logging: false,
        }
    }
}

impl RouterConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable route configuration validation.
    pub fn with_validate_routes(mut self, enabled: bool) -> Self {
        self.validate_routes = enabled;
        self
    }

    /// Set the lifecycle event channel capacity.
    pub fn with_event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size;
        self
    }

    /// Set the compiled matcher cache capacity.
    pub fn with_matcher_cache_size(mut self, size: usize) -> Self {
        self.matcher_cache_size = size;
        self
    }

    /// Enable or disable verbose lifecycle logging.
    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    /// Check that every field holds a usable value.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.event_buffer == 0 {
            return Err(ConfigValidationError::InvalidEventBuffer);
        }
        if self.matcher_cache_size == 0 {
            return Err(ConfigValidationError::InvalidMatcherCacheSize);
        }
        Ok(())
    }
}
