//! The router store: current tree revision, identity cache and active chain.
//!
//! The tree is persistent. A mutation copies the path from the root to the
//! changed node and swaps the root in one write, so readers always see a
//! complete revision. The key cache is updated in the same critical section.
//!
//! Listeners are notified synchronously after each mutation, outside the lock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use super::matcher::MatcherCache;
use super::node::{Children, NodeKey, NodeUpdate, RouteConfig, RouteNode};
use super::resolve::MatchResult;
use crate::location::Location;
use crate::sync::{lock, read, write};
use crate::{RouterError, RouterResult};

/// A change published to store listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    /// A node's children were replaced (or a lazy node was expanded)
    ChildrenReplaced { key: NodeKey, revision: u64 },
    /// A node's fields were updated
    NodeUpdated { key: NodeKey, revision: u64 },
    /// A navigation was committed
    Committed { sequence: u64, location: Location },
}

/// Store listener callback.
pub type StoreListener = Arc<dyn Fn(&StoreChange) + Send + Sync>;

/// Handle returned by [`RouterStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct TreeState {
    root: Arc<RouteNode>,
    cache: HashMap<NodeKey, Arc<RouteNode>>,
    revision: u64,
}

#[derive(Default)]
struct ActiveState {
    location: Location,
    nodes: Vec<MatchResult>,
    prev_nodes: Vec<MatchResult>,
    sequence: Option<u64>,
}

/// Owner of the route tree and the committed navigation state.
pub struct RouterStore {
    tree: RwLock<TreeState>,
    active: RwLock<ActiveState>,
    matchers: MatcherCache,
    listeners: Mutex<Vec<(ListenerId, StoreListener)>>,
    next_listener: AtomicU64,
}

impl std::fmt::Debug for RouterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tree = read(&self.tree);
        f.debug_struct("RouterStore")
            .field("revision", &tree.revision)
            .field("nodes", &tree.cache.len())
            .field("location", &read(&self.active).location)
            .finish()
    }
}

impl RouterStore {
    /// Create a store whose root is `root`.
    pub fn new(root: RouteConfig, matcher_cache_size: usize) -> RouterResult<Self> {
        let matchers = MatcherCache::new(matcher_cache_size);
        let root = RouteNode::from_config(root, &matchers)?;

        let mut cache = HashMap::new();
        index(&root, &mut cache)?;

        Ok(Self {
            tree: RwLock::new(TreeState {
                root,
                cache,
                revision: 0,
            }),
            active: RwLock::new(ActiveState::default()),
            matchers,
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(1),
        })
    }

    /// Create a store with an empty partial root and `routes` as its children.
    pub fn with_routes(routes: Vec<RouteConfig>, matcher_cache_size: usize) -> RouterResult<Self> {
        Self::new(RouteConfig::new("").children(routes), matcher_cache_size)
    }

    // =========================================================================
    // Tree access
    // =========================================================================

    /// Root of the current revision.
    pub fn root(&self) -> Arc<RouteNode> {
        Arc::clone(&read(&self.tree).root)
    }

    /// Number of tree mutations applied so far.
    pub fn revision(&self) -> u64 {
        read(&self.tree).revision
    }

    /// Look up a node of the current revision by key.
    pub fn get(&self, key: &NodeKey) -> Option<Arc<RouteNode>> {
        read(&self.tree).cache.get(key).cloned()
    }

    /// Returns true if `key` is in the current revision.
    pub fn contains(&self, key: &NodeKey) -> bool {
        read(&self.tree).cache.contains_key(key)
    }

    /// Depth-first search of the current revision.
    pub fn find(&self, predicate: impl Fn(&RouteNode) -> bool) -> Option<Arc<RouteNode>> {
        fn walk(node: &Arc<RouteNode>, predicate: &dyn Fn(&RouteNode) -> bool) -> Option<Arc<RouteNode>> {
            if predicate(node) {
                return Some(Arc::clone(node));
            }
            node.children
                .resolved()
                .iter()
                .find_map(|child| walk(child, predicate))
        }
        walk(&self.root(), &predicate)
    }

    /// Nodes from the root down to `key`, inclusive.
    pub fn path_to(&self, key: &NodeKey) -> Option<Vec<Arc<RouteNode>>> {
        path_to(&read(&self.tree).root, key)
    }

    /// The shared compiled-matcher cache.
    pub fn matchers(&self) -> &MatcherCache {
        &self.matchers
    }

    // =========================================================================
    // Tree mutation
    // =========================================================================

    /// Replace a node's children with nodes built from `configs`.
    #[tracing::instrument(skip(self, key, configs), fields(node_key = %key))]
    pub fn replace_children(
        &self,
        key: &NodeKey,
        configs: Vec<RouteConfig>,
    ) -> RouterResult<Vec<Arc<RouteNode>>> {
        let children = self.build(configs)?;
        let revision = {
            let mut tree = write(&self.tree);
            let node = tree
                .cache
                .get(key)
                .cloned()
                .ok_or_else(|| RouterError::node_not_found(key))?;
            swap_node(&mut tree, node.with_children(Children::Resolved(children.clone())))?
        };

        tracing::debug!(children = children.len(), revision, "children replaced");
        self.publish(StoreChange::ChildrenReplaced {
            key: key.clone(),
            revision,
        });
        Ok(children)
    }

    /// Expand a lazy node with loaded `configs`.
    ///
    /// Idempotent: if the node was already expanded (by a concurrent
    /// navigation) its current children are returned and `configs` dropped.
    #[tracing::instrument(skip(self, key, configs), fields(node_key = %key))]
    pub fn expand_children(
        &self,
        key: &NodeKey,
        configs: Vec<RouteConfig>,
    ) -> RouterResult<Vec<Arc<RouteNode>>> {
        if let Some(existing) = self.expanded(key)? {
            return Ok(existing);
        }

        let children = self.build(configs)?;
        let revision = {
            let mut tree = write(&self.tree);
            let node = tree
                .cache
                .get(key)
                .cloned()
                .ok_or_else(|| RouterError::node_not_found(key))?;
            if let Children::Resolved(existing) = &node.children {
                return Ok(existing.clone());
            }
            swap_node(&mut tree, node.with_children(Children::Resolved(children.clone())))?
        };

        tracing::debug!(children = children.len(), revision, "lazy children expanded");
        self.publish(StoreChange::ChildrenReplaced {
            key: key.clone(),
            revision,
        });
        Ok(children)
    }

    /// Update a node's fields, keeping its key and children.
    #[tracing::instrument(skip(self, key, update), fields(node_key = %key))]
    pub fn update_node(&self, key: &NodeKey, update: NodeUpdate) -> RouterResult<Arc<RouteNode>> {
        let (node, revision) = {
            let mut tree = write(&self.tree);
            let node = tree
                .cache
                .get(key)
                .cloned()
                .ok_or_else(|| RouterError::node_not_found(key))?;
            let updated = Arc::new(node.with_update(update, &self.matchers)?);
            let revision = swap_node(&mut tree, (*updated).clone())?;
            let current = tree.cache.get(key).cloned().unwrap_or(updated);
            (current, revision)
        };

        tracing::debug!(revision, "node updated");
        self.publish(StoreChange::NodeUpdated {
            key: key.clone(),
            revision,
        });
        Ok(node)
    }

    fn expanded(&self, key: &NodeKey) -> RouterResult<Option<Vec<Arc<RouteNode>>>> {
        let tree = read(&self.tree);
        let node = tree
            .cache
            .get(key)
            .ok_or_else(|| RouterError::node_not_found(key))?;
        Ok(match &node.children {
            Children::Resolved(children) => Some(children.clone()),
            Children::Lazy(_) => None,
        })
    }

    fn build(&self, configs: Vec<RouteConfig>) -> RouterResult<Vec<Arc<RouteNode>>> {
        configs
            .into_iter()
            .map(|config| RouteNode::from_config(config, &self.matchers))
            .collect()
    }

    // =========================================================================
    // Active navigation state
    // =========================================================================

    /// The committed location.
    pub fn location(&self) -> Location {
        read(&self.active).location.clone()
    }

    /// The committed match chain.
    pub fn nodes(&self) -> Vec<MatchResult> {
        read(&self.active).nodes.clone()
    }

    /// The match chain before the last commit.
    pub fn prev_nodes(&self) -> Vec<MatchResult> {
        read(&self.active).prev_nodes.clone()
    }

    /// Sequence of the last committed navigation.
    pub fn committed_sequence(&self) -> Option<u64> {
        read(&self.active).sequence
    }

    /// Commit a navigation: `prev_nodes := nodes; nodes := chain`.
    ///
    /// Refuses (returns false) when a navigation with a higher sequence has
    /// already been committed. Chain nodes are refreshed to the current
    /// revision so the active chain never points at a replaced node.
    pub fn commit(&self, sequence: u64, location: Location, chain: Vec<MatchResult>) -> bool {
        let chain: Vec<MatchResult> = {
            let tree = read(&self.tree);
            chain
                .into_iter()
                .map(|mut link| {
                    if let Some(current) = tree.cache.get(link.key()) {
                        link.node = Arc::clone(current);
                    }
                    link
                })
                .collect()
        };

        {
            let mut active = write(&self.active);
            if let Some(last) = active.sequence.filter(|last| sequence < *last) {
                tracing::warn!(sequence, last, "refusing stale commit");
                return false;
            }
            active.prev_nodes = std::mem::replace(&mut active.nodes, chain);
            active.location = location.clone();
            active.sequence = Some(sequence);
        }

        self.publish(StoreChange::Committed { sequence, location });
        true
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a listener for store changes.
    pub fn subscribe(&self, listener: impl Fn(&StoreChange) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn publish(&self, change: StoreChange) {
        let listeners: Vec<StoreListener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        tracing::trace!(listeners = listeners.len(), change = ?change, "store change published");
        for listener in listeners {
            listener(&change);
        }
    }
}

// =============================================================================
// Path copying
// =============================================================================

/// Swap in `replacement` (same key as an existing node) and rebuild its
/// ancestors. Returns the new revision.
fn swap_node(tree: &mut TreeState, replacement: RouteNode) -> RouterResult<u64> {
    let key = replacement.key.clone();
    let path = path_to(&tree.root, &key).ok_or_else(|| RouterError::node_not_found(&key))?;
    let old = path
        .last()
        .cloned()
        .ok_or_else(|| RouterError::node_not_found(&key))?;

    let mut removed = HashMap::new();
    for child in old.children.resolved() {
        index_into(child, &mut removed);
    }
    let mut added = HashMap::new();
    for child in replacement.children.resolved() {
        index_into(child, &mut added);
    }

    let removed_keys: HashSet<&NodeKey> = removed.keys().collect();
    if let Some(duplicate) = added
        .keys()
        .find(|k| **k == key || (tree.cache.contains_key(*k) && !removed_keys.contains(k)))
    {
        return Err(RouterError::invalid_config(format!(
            "Duplicate route key '{}'",
            duplicate
        )));
    }

    for removed_key in removed.keys() {
        tree.cache.remove(removed_key);
    }
    tree.cache.extend(added);

    let mut current = Arc::new(replacement);
    tree.cache.insert(key, Arc::clone(&current));

    for ancestor in path.iter().rev().skip(1) {
        let children = ancestor
            .children
            .resolved()
            .iter()
            .map(|child| {
                if child.key == current.key {
                    Arc::clone(&current)
                } else {
                    Arc::clone(child)
                }
            })
            .collect();
        current = Arc::new(ancestor.with_children(Children::Resolved(children)));
        tree.cache.insert(current.key.clone(), Arc::clone(&current));
    }

    tree.root = current;
    tree.revision += 1;
    Ok(tree.revision)
}

fn path_to(node: &Arc<RouteNode>, key: &NodeKey) -> Option<Vec<Arc<RouteNode>>> {
    if &node.key == key {
        return Some(vec![Arc::clone(node)]);
    }
    node.children.resolved().iter().find_map(|child| {
        path_to(child, key).map(|mut path| {
            path.insert(0, Arc::clone(node));
            path
        })
    })
}

fn index(node: &Arc<RouteNode>, cache: &mut HashMap<NodeKey, Arc<RouteNode>>) -> RouterResult<()> {
    if cache.insert(node.key.clone(), Arc::clone(node)).is_some() {
        return Err(RouterError::invalid_config(format!(
            "Duplicate route key '{}'",
            node.key
        )));
    }
    for child in node.children.resolved() {
        index(child, cache)?;
    }
    Ok(())
}

fn index_into(node: &Arc<RouteNode>, cache: &mut HashMap<NodeKey, Arc<RouteNode>>) {
    cache.insert(node.key.clone(), Arc::clone(node));
    for child in node.children.resolved() {
        index_into(child, cache);
    }
}
