//! Navigation intents and the step outcome type
//!
//! A [`Navigation`] encodes the kind of transition, where it goes from and
//! to, and its sequence number. Guards and middleware receive it and may use
//! it to derive the next navigation: [`Navigation::redirect_to`] and
//! [`Navigation::go_back`] produce an [`Outcome::Redirect`] that tells the
//! scheduler to abandon the current navigation and start the derived one.

use serde::{Deserialize, Serialize};

use crate::location::{Href, Location};
use crate::tree::MatchResult;

/// Kind of navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NavigationType {
    /// New history entry
    Push,
    /// History traversal reported by the host (including the initial load)
    Pop,
    /// Replace the current history entry
    Replace,
    /// Step back one history entry
    GoBack,
}

impl std::fmt::Display for NavigationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Push => write!(f, "PUSH"),
            Self::Pop => write!(f, "POP"),
            Self::Replace => write!(f, "REPLACE"),
            Self::GoBack => write!(f, "GO_BACK"),
        }
    }
}

/// Fields used to build a [`Navigation`].
#[derive(Debug, Clone)]
pub struct NavigationDescriptor {
    /// Kind of navigation
    pub navigation_type: NavigationType,
    /// Target location (`None` for go-back)
    pub to: Option<Location>,
    /// Origin location
    pub from: Option<Location>,
    /// Sequence number (default 0)
    pub sequence: u64,
    /// Overrides the `sequence > 0` default
    pub should_transition: Option<bool>,
}

impl NavigationDescriptor {
    /// Describe a navigation of `navigation_type` to `to`.
    pub fn new(navigation_type: NavigationType, to: Option<Location>) -> Self {
        Self {
            navigation_type,
            to,
            from: None,
            sequence: 0,
            should_transition: None,
        }
    }

    /// Set the origin location.
    pub fn from(mut self, from: Location) -> Self {
        self.from = Some(from);
        self
    }

    /// Set the sequence number.
    pub fn sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Force transition effects on or off.
    pub fn should_transition(mut self, should_transition: bool) -> Self {
        self.should_transition = Some(should_transition);
        self
    }
}

/// A navigation intent.
///
/// Sequence numbers strictly increase over the lifetime of one scheduler;
/// a navigation older than the latest dispatched one is stale and is never
/// committed.
#[derive(Debug, Clone)]
pub struct Navigation {
    /// Kind of navigation
    pub navigation_type: NavigationType,
    /// Monotonic sequence number
    pub sequence: u64,
    /// Target location (`None` for go-back)
    pub to: Option<Location>,
    /// Origin location
    pub from: Option<Location>,
    /// Whether exit/enter transition effects run (false for the initial load)
    pub should_transition: bool,
    /// Deepest match of the target, set once the path is resolved
    pub leaf: Option<MatchResult>,
}

impl From<NavigationDescriptor> for Navigation {
    fn from(d: NavigationDescriptor) -> Self {
        Self {
            navigation_type: d.navigation_type,
            sequence: d.sequence,
            to: d.to,
            from: d.from,
            should_transition: d.should_transition.unwrap_or(d.sequence > 0),
            leaf: None,
        }
    }
}

impl Navigation {
    /// Create a navigation from a descriptor.
    pub fn new(descriptor: NavigationDescriptor) -> Self {
        descriptor.into()
    }

    /// A POP navigation with no target.
    pub fn empty() -> Self {
        NavigationDescriptor::new(NavigationType::Pop, None).into()
    }

    /// Derive the following navigation: one sequence later, starting where
    /// this one was going.
    pub fn next(&self, descriptor: NavigationDescriptor) -> Navigation {
        NavigationDescriptor {
            navigation_type: descriptor.navigation_type,
            to: descriptor.to,
            from: self.to.clone(),
            sequence: self.sequence + 1,
            should_transition: None,
        }
        .into()
    }

    /// Derive a go-back navigation one sequence later.
    pub fn prev(&self) -> Navigation {
        NavigationDescriptor {
            navigation_type: NavigationType::GoBack,
            to: None,
            from: self.to.clone(),
            sequence: self.sequence + 1,
            should_transition: None,
        }
        .into()
    }

    /// Abandon this navigation in favor of a REPLACE to `href`.
    ///
    /// Relative string hrefs resolve against the parent url of the deepest
    /// matched route, so a guard on `/a/b` redirecting to `c` lands on `/a/c`.
    pub fn redirect_to<T>(&self, href: impl Into<Href>) -> Outcome<T> {
        let to = match href.into() {
            Href::Path(path) if path.starts_with('/') => Location::parse(&path),
            Href::Path(path) => {
                let parent_url = self
                    .leaf
                    .as_ref()
                    .map(|leaf| leaf.parent_url.as_str())
                    .unwrap_or("");
                Location::parse(&format!("{}/{}", parent_url, path))
            }
            Href::Location(location) => location,
            Href::Descriptor(descriptor) => {
                let fallback = self.to.as_ref().map(|l| l.pathname.as_str()).unwrap_or("/");
                descriptor.into_location(fallback)
            }
        };

        Outcome::Redirect(self.next(NavigationDescriptor::new(
            NavigationType::Replace,
            Some(to),
        )))
    }

    /// Abandon this navigation in favor of stepping back.
    pub fn go_back<T>(&self) -> Outcome<T> {
        Outcome::Redirect(self.prev())
    }

    /// Pathname of the target, if any.
    pub fn pathname(&self) -> Option<&str> {
        self.to.as_ref().map(|to| to.pathname.as_str())
    }

    pub(crate) fn with_leaf(mut self, leaf: Option<MatchResult>) -> Self {
        self.leaf = leaf;
        self
    }
}

/// Result of a guard or middleware step.
#[derive(Debug, Clone)]
pub enum Outcome<T = ()> {
    /// Continue with this value
    Proceed(T),
    /// Abandon the current navigation and start this one instead
    Redirect(Navigation),
    /// Abandon the current navigation, keeping the committed state
    Cancel(String),
}

impl<T> Outcome<T> {
    /// Map the proceed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Proceed(value) => Outcome::Proceed(f(value)),
            Self::Redirect(navigation) => Outcome::Redirect(navigation),
            Self::Cancel(reason) => Outcome::Cancel(reason),
        }
    }

    /// Returns true if the step allows the navigation to continue.
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed(_))
    }
}
