//! Depth-first path resolution against a route tree.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;

use super::matcher::{MatchMode, Params};
use super::node::{Children, NodeKey, RouteNode};
use crate::{RouterError, RouterResult};

/// Callback invoked when the resolver reaches a node whose children are
/// still behind a loader; returns the expanded children.
pub type OnExhausted =
    dyn Fn(Arc<RouteNode>) -> BoxFuture<'static, RouterResult<Vec<Arc<RouteNode>>>> + Send + Sync;

/// One link of a match chain.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The matched node
    pub node: Arc<RouteNode>,
    /// Params bound along the chain up to and including this node
    pub params: Params,
    /// Portion of the path consumed by this node
    pub segment: String,
    /// Unmatched suffix after this node (`None` when fully consumed)
    pub remaining: Option<String>,
    /// Concatenated segments of all ancestors
    pub parent_url: String,
}

impl MatchResult {
    /// The node's key.
    pub fn key(&self) -> &NodeKey {
        &self.node.key
    }

    /// Concatenated segments up to and including this node.
    pub fn url(&self) -> String {
        format!("{}{}", self.parent_url, self.segment)
    }
}

enum Resolution {
    Complete(Vec<MatchResult>),
    Partial(Vec<MatchResult>),
    NoMatch,
}

/// Resolve `path` starting at `root`.
///
/// Children are tried in declaration order and the first subtree that
/// consumes the whole path wins. Lazy children are expanded through
/// `on_exhausted` when the resolver reaches them. On failure the error
/// carries the deepest partial chain found.
pub async fn resolve(
    root: Arc<RouteNode>,
    path: &str,
    on_exhausted: &OnExhausted,
) -> RouterResult<Vec<MatchResult>> {
    let path = if path.is_empty() { "/" } else { path };

    match visit(root, path, "", &Params::new(), on_exhausted).await? {
        Resolution::Complete(chain) => {
            tracing::trace!(path = %path, depth = chain.len(), "path resolved");
            Ok(chain)
        }
        Resolution::Partial(chain) => Err(RouterError::not_found(path).with_matched(chain)),
        Resolution::NoMatch => Err(RouterError::not_found(path)),
    }
}

fn visit<'a>(
    node: Arc<RouteNode>,
    url: &'a str,
    parent_url: &'a str,
    inherited: &'a Params,
    on_exhausted: &'a OnExhausted,
) -> BoxFuture<'a, RouterResult<Resolution>> {
    async move {
        let Some(found) = node.matcher().match_path(url) else {
            return Ok(Resolution::NoMatch);
        };

        let mut params = inherited.clone();
        params.extend(found.params);

        let this = MatchResult {
            node: Arc::clone(&node),
            params,
            segment: found.segment,
            remaining: found.remaining,
            parent_url: parent_url.to_string(),
        };

        if node.match_mode != MatchMode::Partial {
            return Ok(Resolution::Complete(vec![this]));
        }

        let rest = this.remaining.clone().unwrap_or_default();
        let children = match &node.children {
            Children::Resolved(children) => children.clone(),
            Children::Lazy(_) => on_exhausted(Arc::clone(&node)).await?,
        };

        let child_parent_url = this.url();
        let mut deepest: Vec<MatchResult> = Vec::new();

        for child in children {
            let resolution = visit(child, &rest, &child_parent_url, &this.params, on_exhausted).await?;
            match resolution {
                Resolution::Complete(tail) => return Ok(Resolution::Complete(prepend(this, tail))),
                Resolution::Partial(tail) if tail.len() > deepest.len() => deepest = tail,
                _ => {}
            }
        }

        if rest.is_empty() || rest == "/" {
            Ok(Resolution::Complete(vec![this]))
        } else {
            Ok(Resolution::Partial(prepend(this, deepest)))
        }
    }
    .boxed()
}

fn prepend(head: MatchResult, tail: Vec<MatchResult>) -> Vec<MatchResult> {
    let mut chain = Vec::with_capacity(tail.len() + 1);
    chain.push(head);
    chain.extend(tail);
    chain
}
