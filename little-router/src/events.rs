//! Navigation lifecycle events
//!
//! Every step of a navigation produces one [`Event`]. Events flow through the
//! middleware pipeline (which may rewrite them) and are then broadcast to
//! observers subscribed with [`Router::events`](crate::Router::events).
//!
//! # Event Order
//!
//! A committed navigation produces, in order:
//!
//! 1. `NAVIGATION_START`
//! 2. for each lazy node reached: `CHILDREN_CONFIG_REQUEST`,
//!    `CHILDREN_CONFIG_LOAD`, `CHILDREN_LOAD`
//! 3. `NAVIGATION_RESULT_MATCHED`
//! 4. `NAVIGATION_ACTIVATING`
//! 5. `NAVIGATION_ACTIVATED`
//! 6. `NAVIGATION_END`
//!
//! A redirected or cancelled navigation ends with `NAVIGATION_CANCELLED`
//! and a failed one with `NAVIGATION_ERROR`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::RouterError;
use crate::navigation::Navigation;
use crate::tree::{MatchResult, NodeKey, RouteConfig, RouteNode};

/// Tag of an [`Event`], used as the pipeline dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    NavigationStart,
    ChildrenConfigRequest,
    ChildrenConfigLoad,
    ChildrenLoad,
    NavigationResultMatched,
    NavigationActivating,
    NavigationActivated,
    NavigationCancelled,
    NavigationError,
    NavigationEnd,
}

impl EventType {
    /// Every event type, in lifecycle order.
    pub const ALL: [EventType; 10] = [
        Self::NavigationStart,
        Self::ChildrenConfigRequest,
        Self::ChildrenConfigLoad,
        Self::ChildrenLoad,
        Self::NavigationResultMatched,
        Self::NavigationActivating,
        Self::NavigationActivated,
        Self::NavigationCancelled,
        Self::NavigationError,
        Self::NavigationEnd,
    ];

    /// Returns the string representation of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NavigationStart => "NAVIGATION_START",
            Self::ChildrenConfigRequest => "CHILDREN_CONFIG_REQUEST",
            Self::ChildrenConfigLoad => "CHILDREN_CONFIG_LOAD",
            Self::ChildrenLoad => "CHILDREN_LOAD",
            Self::NavigationResultMatched => "NAVIGATION_RESULT_MATCHED",
            Self::NavigationActivating => "NAVIGATION_ACTIVATING",
            Self::NavigationActivated => "NAVIGATION_ACTIVATED",
            Self::NavigationCancelled => "NAVIGATION_CANCELLED",
            Self::NavigationError => "NAVIGATION_ERROR",
            Self::NavigationEnd => "NAVIGATION_END",
        }
    }

    /// Returns true for events that end a navigation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::NavigationCancelled | Self::NavigationError | Self::NavigationEnd
        )
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A navigation lifecycle event.
#[derive(Debug, Clone)]
pub enum Event {
    /// A navigation was dispatched
    NavigationStart { navigation: Navigation },
    /// The resolver reached a lazy node
    ChildrenConfigRequest { navigation: Navigation, key: NodeKey },
    /// A lazy node's configuration was loaded; middleware may rewrite `configs`
    ChildrenConfigLoad {
        navigation: Navigation,
        key: NodeKey,
        configs: Vec<RouteConfig>,
    },
    /// A lazy node's children entered the tree
    ChildrenLoad {
        navigation: Navigation,
        key: NodeKey,
        children: Vec<Arc<RouteNode>>,
    },
    /// The target path resolved to a match chain
    NavigationResultMatched {
        navigation: Navigation,
        chain: Vec<MatchResult>,
    },
    /// Guards are about to run for the matched chain
    NavigationActivating {
        navigation: Navigation,
        chain: Vec<MatchResult>,
    },
    /// The navigation was committed to the store
    NavigationActivated {
        navigation: Navigation,
        chain: Vec<MatchResult>,
    },
    /// The navigation was abandoned; `next_navigation` is set for redirects
    NavigationCancelled {
        navigation: Navigation,
        next_navigation: Option<Navigation>,
        reason: Option<String>,
    },
    /// The navigation failed
    NavigationError {
        navigation: Navigation,
        error: RouterError,
    },
    /// The navigation finished
    NavigationEnd { navigation: Navigation },
}

impl Event {
    /// The event's tag.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::NavigationStart { .. } => EventType::NavigationStart,
            Self::ChildrenConfigRequest { .. } => EventType::ChildrenConfigRequest,
            Self::ChildrenConfigLoad { .. } => EventType::ChildrenConfigLoad,
            Self::ChildrenLoad { .. } => EventType::ChildrenLoad,
            Self::NavigationResultMatched { .. } => EventType::NavigationResultMatched,
            Self::NavigationActivating { .. } => EventType::NavigationActivating,
            Self::NavigationActivated { .. } => EventType::NavigationActivated,
            Self::NavigationCancelled { .. } => EventType::NavigationCancelled,
            Self::NavigationError { .. } => EventType::NavigationError,
            Self::NavigationEnd { .. } => EventType::NavigationEnd,
        }
    }

    /// The navigation this event belongs to.
    pub fn navigation(&self) -> &Navigation {
        match self {
            Self::NavigationStart { navigation }
            | Self::ChildrenConfigRequest { navigation, .. }
            | Self::ChildrenConfigLoad { navigation, .. }
            | Self::ChildrenLoad { navigation, .. }
            | Self::NavigationResultMatched { navigation, .. }
            | Self::NavigationActivating { navigation, .. }
            | Self::NavigationActivated { navigation, .. }
            | Self::NavigationCancelled { navigation, .. }
            | Self::NavigationError { navigation, .. }
            | Self::NavigationEnd { navigation } => navigation,
        }
    }

    /// Sequence number of the event's navigation.
    pub fn sequence(&self) -> u64 {
        self.navigation().sequence
    }

    /// The match chain carried by matched/activating/activated events.
    pub fn chain(&self) -> Option<&[MatchResult]> {
        match self {
            Self::NavigationResultMatched { chain, .. }
            | Self::NavigationActivating { chain, .. }
            | Self::NavigationActivated { chain, .. } => Some(chain),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::NavigationType;
    use crate::{Location, NavigationDescriptor};

    #[test]
    fn test_event_type_serialization() {
        let json = serde_json::to_string(&EventType::ChildrenConfigLoad).unwrap();
        assert_eq!(json, "\"CHILDREN_CONFIG_LOAD\"");

        for event_type in EventType::ALL {
            let json = serde_json::to_value(event_type).unwrap();
            assert_eq!(json, event_type.as_str());
        }
    }

    #[test]
    fn test_terminal_types() {
        let terminal: Vec<_> = EventType::ALL.into_iter().filter(EventType::is_terminal).collect();
        assert_eq!(
            terminal,
            vec![
                EventType::NavigationCancelled,
                EventType::NavigationError,
                EventType::NavigationEnd
            ]
        );
    }

    #[test]
    fn test_event_accessors() {
        let navigation: Navigation =
            NavigationDescriptor::new(NavigationType::Push, Some(Location::new("/a")))
                .sequence(3)
                .into();
        let event = Event::NavigationError {
            navigation,
            error: RouterError::not_found("/a"),
        };
        assert_eq!(event.event_type(), EventType::NavigationError);
        assert_eq!(event.sequence(), 3);
        assert!(event.chain().is_none());
    }
}
