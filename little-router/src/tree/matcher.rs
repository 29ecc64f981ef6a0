//! Path pattern matching for route nodes.
//!
//! # Pattern Syntax
//!
//! - `shows` - literal segment, matched exactly (case-sensitive)
//! - `:id` - dynamic segment, bound into the match params (excludes `/`)
//! - leading and trailing slashes are ignored, so `/shows/:id` == `shows/:id`
//!
//! # Match Modes
//!
//! - `partial` - the pattern consumes a prefix that ends on a segment
//!   boundary; the unmatched suffix is handed to the children
//! - `full` - the pattern must consume the whole remaining path (a single
//!   trailing slash is tolerated)
//! - `any` - matches the rest of the path unconditionally; terminal
//!
//! Patterns compile to anchored regexes. Compiled matchers are shared
//! through an LRU [`MatcherCache`] since route trees repeat patterns such as
//! `:id` or the empty index pattern many times.

use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use crate::sync::lock;
use crate::{RouterError, RouterResult};

/// Path parameters bound by dynamic segments.
pub type Params = BTreeMap<String, String>;

/// How a node's pattern is applied to the remaining path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Consume the entire remaining path
    Full,
    /// Consume a prefix and pass the rest to children
    #[default]
    Partial,
    /// Consume anything; terminal
    Any,
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Partial => write!(f, "partial"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// Successful application of a pattern to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// Params bound by this pattern alone
    pub params: Params,
    /// Matched portion of the path
    pub segment: String,
    /// Unmatched suffix; `None` when the path was fully consumed
    pub remaining: Option<String>,
}

/// A compiled path pattern.
#[derive(Debug)]
pub struct PathMatcher {
    pattern: String,
    mode: MatchMode,
    regex: regex::Regex,
    param_names: Vec<String>,
}

impl PathMatcher {
    /// Compile `pattern` for `mode`.
    pub fn new(pattern: &str, mode: MatchMode) -> RouterResult<Self> {
        let mut body = String::new();
        let mut param_names = Vec::new();

        for segment in pattern.split('/').filter(|s| !s.is_empty()) {
            match segment.strip_prefix(':') {
                Some(name) => {
                    param_names.push(name.to_string());
                    body.push_str("/([^/]+)");
                }
                None => {
                    body.push('/');
                    body.push_str(&regex::escape(segment));
                }
            }
        }

        let source = match mode {
            MatchMode::Partial => format!("^({})(/.*)?$", body),
            MatchMode::Full => format!("^({})/?$", body),
            MatchMode::Any => "^(.*)$".to_string(),
        };

        let regex = regex::Regex::new(&source).map_err(|e| {
            RouterError::invalid_config(format!("Invalid route pattern '{}'", pattern))
                .with_cause(e.to_string())
        })?;

        Ok(Self {
            pattern: pattern.to_string(),
            mode,
            regex,
            param_names,
        })
    }

    /// The original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The match mode this matcher was compiled for.
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Dynamic segment names in pattern order.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Apply the pattern to `url`.
    pub fn match_path(&self, url: &str) -> Option<PathMatch> {
        if self.mode == MatchMode::Any {
            return Some(PathMatch {
                params: Params::new(),
                segment: url.to_string(),
                remaining: Some(String::new()),
            });
        }

        let captures = self.regex.captures(url)?;
        let segment = captures.get(1).map(|m| m.as_str()).unwrap_or_default();

        let params = self
            .param_names
            .iter()
            .enumerate()
            .filter_map(|(idx, name)| {
                captures
                    .get(idx + 2)
                    .map(|value| (name.clone(), value.as_str().to_string()))
            })
            .collect();

        let remaining = match self.mode {
            MatchMode::Partial => captures
                .get(self.param_names.len() + 2)
                .map(|m| m.as_str().to_string()),
            _ => None,
        };

        Some(PathMatch {
            params,
            segment: segment.to_string(),
            remaining,
        })
    }
}

/// LRU cache of compiled matchers keyed by pattern and mode.
#[derive(Debug)]
pub struct MatcherCache {
    entries: Mutex<LruCache<(String, MatchMode), Arc<PathMatcher>>>,
}

impl MatcherCache {
    /// Create a cache holding at most `capacity` matchers.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fetch a compiled matcher, compiling and caching it on a miss.
    pub fn get_or_compile(&self, pattern: &str, mode: MatchMode) -> RouterResult<Arc<PathMatcher>> {
        let key = (pattern.to_string(), mode);
        if let Some(matcher) = lock(&self.entries).get(&key) {
            tracing::trace!(pattern = %pattern, mode = %mode, "matcher cache hit");
            return Ok(Arc::clone(matcher));
        }

        let matcher = Arc::new(PathMatcher::new(pattern, mode)?);
        tracing::trace!(pattern = %pattern, mode = %mode, "matcher compiled");
        lock(&self.entries).put(key, Arc::clone(&matcher));
        Ok(matcher)
    }

    /// Number of cached matchers.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MatcherCache {
    fn default() -> Self {
        Self::new(128)
    }
}
