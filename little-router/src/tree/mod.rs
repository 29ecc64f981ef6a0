//! Route matching tree
//!
//! - [`RouteConfig`] - declarative route definitions
//! - [`RouteNode`] - immutable nodes of one tree revision
//! - [`PathMatcher`] / [`MatcherCache`] - compiled path patterns
//! - [`resolve`] - depth-first path resolution with lazy expansion
//! - [`RouterStore`] - the current revision, key cache and active chain

mod matcher;
mod node;
mod resolve;
mod store;

pub use matcher::{MatchMode, MatcherCache, Params, PathMatch, PathMatcher};
pub use node::{Children, Guard, LazyChildren, Loader, NodeKey, NodeUpdate, RouteConfig, RouteNode};
pub use resolve::{MatchResult, OnExhausted, resolve};
pub use store::{ListenerId, RouterStore, StoreChange, StoreListener};
