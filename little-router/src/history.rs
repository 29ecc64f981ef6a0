//! History collaborator
//!
//! The router never owns the location stack. It talks to a [`History`]
//! implementation (a browser binding, a native shell, or [`MemoryHistory`]
//! for tests and headless use) and reacts to its change notifications.
//!
//! Implementations notify listeners synchronously from `push`, `replace`
//! and `go_back`.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::location::Location;
use crate::sync::lock;

/// How the history changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HistoryAction {
    Push,
    Pop,
    Replace,
}

/// History change callback.
pub type HistoryListener = Arc<dyn Fn(&Location, HistoryAction) + Send + Sync>;

/// Handle returned by [`History::listen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryListenerId(u64);

/// A linear stack of locations.
pub trait History: Send + Sync {
    /// The current location.
    fn location(&self) -> Location;

    /// Register a change listener.
    fn listen(&self, listener: HistoryListener) -> HistoryListenerId;

    /// Remove a change listener.
    fn unlisten(&self, id: HistoryListenerId);

    /// Add an entry and make it current.
    fn push(&self, location: Location);

    /// Replace the current entry.
    fn replace(&self, location: Location);

    /// Step back one entry.
    fn go_back(&self);

    /// Returns true if `go_back` would change the location.
    fn can_go_back(&self) -> bool {
        true
    }
}

struct Entries {
    stack: Vec<Location>,
    index: usize,
}

/// In-memory history.
pub struct MemoryHistory {
    entries: Mutex<Entries>,
    listeners: Mutex<Vec<(HistoryListenerId, HistoryListener)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for MemoryHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = lock(&self.entries);
        f.debug_struct("MemoryHistory")
            .field("entries", &entries.stack)
            .field("index", &entries.index)
            .finish()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new(Location::root())
    }
}

impl MemoryHistory {
    /// Create a history with a single entry.
    pub fn new(initial: Location) -> Self {
        Self {
            entries: Mutex::new(Entries {
                stack: vec![initial],
                index: 0,
            }),
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a history starting at the href `initial`.
    pub fn at(initial: &str) -> Self {
        Self::new(Location::parse(initial))
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> Vec<Location> {
        lock(&self.entries).stack.clone()
    }

    /// Index of the current entry.
    pub fn index(&self) -> usize {
        lock(&self.entries).index
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        lock(&self.entries).stack.len()
    }

    /// Always false; a history has at least one entry.
    pub fn is_empty(&self) -> bool {
        false
    }

    fn notify(&self, location: &Location, action: HistoryAction) {
        let listeners: Vec<HistoryListener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(location, action);
        }
    }
}

impl History for MemoryHistory {
    fn location(&self) -> Location {
        let entries = lock(&self.entries);
        entries.stack[entries.index].clone()
    }

    fn listen(&self, listener: HistoryListener) -> HistoryListenerId {
        let id = HistoryListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.listeners).push((id, listener));
        id
    }

    fn unlisten(&self, id: HistoryListenerId) {
        lock(&self.listeners).retain(|(existing, _)| *existing != id);
    }

    fn push(&self, location: Location) {
        {
            let mut entries = lock(&self.entries);
            let next = entries.index + 1;
            entries.stack.truncate(next);
            entries.stack.push(location.clone());
            entries.index = next;
        }
        self.notify(&location, HistoryAction::Push);
    }

    fn replace(&self, location: Location) {
        {
            let mut entries = lock(&self.entries);
            let index = entries.index;
            entries.stack[index] = location.clone();
        }
        self.notify(&location, HistoryAction::Replace);
    }

    fn go_back(&self) {
        let location = {
            let mut entries = lock(&self.entries);
            if entries.index == 0 {
                return;
            }
            entries.index -= 1;
            entries.stack[entries.index].clone()
        };
        self.notify(&location, HistoryAction::Pop);
    }

    fn can_go_back(&self) -> bool {
        lock(&self.entries).index > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(history: &MemoryHistory) -> Arc<Mutex<Vec<(String, HistoryAction)>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        history.listen(Arc::new(move |location: &Location, action| {
            sink.lock().unwrap().push((location.href(), action));
        }));
        log
    }

    #[test]
    fn test_push_replace_back() {
        let history = MemoryHistory::default();
        let log = recorder(&history);

        history.push(Location::parse("/a?x=1"));
        history.push(Location::new("/b"));
        history.replace(Location::new("/c"));
        history.go_back();

        assert_eq!(history.location().href(), "/a?x=1");
        assert_eq!(history.len(), 3);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("/a?x=1".to_string(), HistoryAction::Push),
                ("/b".to_string(), HistoryAction::Push),
                ("/c".to_string(), HistoryAction::Replace),
                ("/a?x=1".to_string(), HistoryAction::Pop),
            ]
        );

        history.push(Location::new("/d"));
        assert_eq!(history.entries().len(), 3);
        assert_eq!(history.index(), 2);
    }

    #[test]
    fn test_go_back_at_first_entry_is_noop() {
        let history = MemoryHistory::at("/start");
        let log = recorder(&history);

        assert!(!history.can_go_back());
        history.go_back();

        assert_eq!(history.location().pathname, "/start");
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unlisten() {
        let history = MemoryHistory::default();
        let log = Arc::new(Mutex::new(0));
        let sink = log.clone();
        let id = history.listen(Arc::new(move |_: &Location, _| {
            *sink.lock().unwrap() += 1;
        }));

        history.push(Location::new("/a"));
        history.unlisten(id);
        history.push(Location::new("/b"));

        assert_eq!(*log.lock().unwrap(), 1);
    }
}
