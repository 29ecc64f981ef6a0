//! Route configuration and the immutable route nodes built from it.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use uuid::Uuid;

use super::matcher::{MatchMode, MatcherCache, PathMatcher};
use super::resolve::MatchResult;
use crate::navigation::{Navigation, Outcome};
use crate::RouterResult;

/// Async loader producing a node's children on demand.
pub type Loader = Arc<dyn Fn() -> BoxFuture<'static, RouterResult<Vec<RouteConfig>>> + Send + Sync>;

/// Async guard deciding whether a navigation may enter or leave a node.
pub type Guard =
    Arc<dyn Fn(Navigation, MatchResult) -> BoxFuture<'static, RouterResult<Outcome>> + Send + Sync>;

// =============================================================================
// Node Key
// =============================================================================

/// Identity of a route node, stable across tree revisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Generate a fresh key (UUID v7, so keys sort by creation time).
    pub fn generate() -> Self {
        Self(format!("node_{}", Uuid::now_v7()))
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Route Configuration
// =============================================================================

/// Declarative route definition.
///
/// Plain fields deserialize from JSON:
///
/// ```json
/// { "path": "shows/:id", "match": "full", "data": { "view": "show" } }
/// ```
///
/// Loaders and guards are closures and are attached with the builder methods.
#[derive(Clone, Default, Deserialize)]
pub struct RouteConfig {
    /// Segment pattern (`shows/:id`)
    #[serde(default)]
    pub path: String,
    /// How the pattern is applied (default: partial)
    #[serde(default, rename = "match")]
    pub match_mode: MatchMode,
    /// Statically declared children
    #[serde(default)]
    pub children: Vec<RouteConfig>,
    /// Route payload, opaque to the router
    #[serde(default)]
    pub data: serde_json::Value,
    /// Explicit key; generated when absent
    #[serde(default)]
    pub key: Option<String>,
    /// Loader for children fetched on demand
    #[serde(skip)]
    pub load_children: Option<Loader>,
    /// Runs before the navigation enters this node
    #[serde(skip)]
    pub can_activate: Option<Guard>,
    /// Runs before the navigation leaves this node
    #[serde(skip)]
    pub can_deactivate: Option<Guard>,
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("path", &self.path)
            .field("match_mode", &self.match_mode)
            .field("children", &self.children)
            .field("data", &self.data)
            .field("key", &self.key)
            .field("load_children", &self.load_children.is_some())
            .field("can_activate", &self.can_activate.is_some())
            .field("can_deactivate", &self.can_deactivate.is_some())
            .finish()
    }
}

impl RouteConfig {
    /// A partial-match route for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Require the pattern to consume the whole remaining path.
    pub fn full(mut self) -> Self {
        self.match_mode = MatchMode::Full;
        self
    }

    /// Match anything from here on.
    pub fn any(mut self) -> Self {
        self.match_mode = MatchMode::Any;
        self
    }

    /// Set the match mode.
    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Declare static children.
    pub fn children(mut self, children: impl IntoIterator<Item = RouteConfig>) -> Self {
        self.children = children.into_iter().collect();
        self
    }

    /// Attach route data.
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Set an explicit key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Load children on demand.
    pub fn load_children<F, Fut>(mut self, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RouterResult<Vec<RouteConfig>>> + Send + 'static,
    {
        let loader: Loader =
            Arc::new(move || -> BoxFuture<'static, RouterResult<Vec<RouteConfig>>> { Box::pin(loader()) });
        self.load_children = Some(loader);
        self
    }

    /// Guard entry into this route.
    pub fn can_activate<F, Fut>(mut self, guard: F) -> Self
    where
        F: Fn(Navigation, MatchResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RouterResult<Outcome>> + Send + 'static,
    {
        self.can_activate = Some(guard_fn(guard));
        self
    }

    /// Guard exit from this route.
    pub fn can_deactivate<F, Fut>(mut self, guard: F) -> Self
    where
        F: Fn(Navigation, MatchResult) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RouterResult<Outcome>> + Send + 'static,
    {
        self.can_deactivate = Some(guard_fn(guard));
        self
    }

    /// Parse a JSON route array.
    pub fn from_json_list(json: &str) -> RouterResult<Vec<RouteConfig>> {
        Ok(serde_json::from_str(json)?)
    }
}

fn guard_fn<F, Fut>(guard: F) -> Guard
where
    F: Fn(Navigation, MatchResult) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RouterResult<Outcome>> + Send + 'static,
{
    Arc::new(move |nav: Navigation, matched: MatchResult| -> BoxFuture<'static, RouterResult<Outcome>> {
        Box::pin(guard(nav, matched))
    })
}

// =============================================================================
// Route Nodes
// =============================================================================

/// A node's children: either resolved or still behind a loader.
#[derive(Clone)]
pub enum Children {
    /// Concrete ordered children
    Resolved(Vec<Arc<RouteNode>>),
    /// Children fetched on first use
    Lazy(Arc<LazyChildren>),
}

impl Children {
    /// Resolved children, or an empty slice for a lazy placeholder.
    pub fn resolved(&self) -> &[Arc<RouteNode>] {
        match self {
            Self::Resolved(children) => children,
            Self::Lazy(_) => &[],
        }
    }

    /// Returns true if the children are still behind a loader.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }
}

impl fmt::Debug for Children {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(children) => f
                .debug_list()
                .entries(children.iter().map(|c| c.key.as_str()))
                .finish(),
            Self::Lazy(lazy) => write!(f, "Lazy(loaded: {})", lazy.is_loaded()),
        }
    }
}

/// A loader shared by every revision of a lazy node.
///
/// The loaded configuration is memoized in a once-cell: concurrent callers
/// wait on the same load and the loader runs once. A failed load is not
/// memoized, so a later navigation retries it.
pub struct LazyChildren {
    loader: Loader,
    loaded: OnceCell<Vec<RouteConfig>>,
}

impl LazyChildren {
    pub(crate) fn new(loader: Loader) -> Self {
        Self {
            loader,
            loaded: OnceCell::new(),
        }
    }

    /// Load the children configuration, running the loader on first use.
    pub async fn load(&self) -> RouterResult<Vec<RouteConfig>> {
        self.loaded
            .get_or_try_init(|| (self.loader)())
            .await
            .cloned()
    }

    /// Returns true once the loader has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }
}

/// An immutable node of one tree revision.
///
/// Mutations never touch a node in place; the store builds a new node (and
/// new ancestors) and swaps the root.
#[derive(Clone)]
pub struct RouteNode {
    /// Identity, stable across revisions
    pub key: NodeKey,
    /// Segment pattern
    pub path: String,
    /// Match mode
    pub match_mode: MatchMode,
    /// Route payload
    pub data: serde_json::Value,
    /// Children of this revision
    pub children: Children,
    /// Entry guard
    pub can_activate: Option<Guard>,
    /// Exit guard
    pub can_deactivate: Option<Guard>,
    matcher: Arc<PathMatcher>,
}

impl fmt::Debug for RouteNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteNode")
            .field("key", &self.key)
            .field("path", &self.path)
            .field("match_mode", &self.match_mode)
            .field("data", &self.data)
            .field("children", &self.children)
            .finish()
    }
}

impl RouteNode {
    /// Build a node (and its static subtree) from configuration.
    pub fn from_config(config: RouteConfig, matchers: &MatcherCache) -> RouterResult<Arc<Self>> {
        let matcher = matchers.get_or_compile(&config.path, config.match_mode)?;

        let children = match config.load_children {
            Some(loader) if config.children.is_empty() => {
                Children::Lazy(Arc::new(LazyChildren::new(loader)))
            }
            _ => Children::Resolved(
                config
                    .children
                    .into_iter()
                    .map(|child| Self::from_config(child, matchers))
                    .collect::<RouterResult<_>>()?,
            ),
        };

        Ok(Arc::new(Self {
            key: config.key.map(NodeKey::from).unwrap_or_else(NodeKey::generate),
            path: config.path,
            match_mode: config.match_mode,
            data: config.data,
            children,
            can_activate: config.can_activate,
            can_deactivate: config.can_deactivate,
            matcher,
        }))
    }

    /// The compiled matcher for this node's pattern.
    pub fn matcher(&self) -> &PathMatcher {
        &self.matcher
    }

    /// Copy of this node with different children.
    pub(crate) fn with_children(&self, children: Children) -> Self {
        Self {
            children,
            ..self.clone()
        }
    }

    /// Copy of this node with fields replaced by `update`.
    pub(crate) fn with_update(&self, update: NodeUpdate, matchers: &MatcherCache) -> RouterResult<Self> {
        let path = update.path.unwrap_or_else(|| self.path.clone());
        let match_mode = update.match_mode.unwrap_or(self.match_mode);
        let matcher = if path == self.path && match_mode == self.match_mode {
            Arc::clone(&self.matcher)
        } else {
            matchers.get_or_compile(&path, match_mode)?
        };

        Ok(Self {
            path,
            match_mode,
            matcher,
            data: update.data.unwrap_or_else(|| self.data.clone()),
            ..self.clone()
        })
    }
}

/// Field replacements applied by [`RouterStore::update_node`](super::RouterStore::update_node).
#[derive(Debug, Clone, Default)]
pub struct NodeUpdate {
    /// New pattern
    pub path: Option<String>,
    /// New match mode
    pub match_mode: Option<MatchMode>,
    /// New payload (replaces the old one wholesale)
    pub data: Option<serde_json::Value>,
}

impl NodeUpdate {
    /// Replace the payload.
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Default::default()
        }
    }

    /// Replace the pattern.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Replace the match mode.
    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = Some(mode);
        self
    }
}
