//! Middleware support for navigation lifecycle events
//!
//! A middleware receives an [`Event`] and read-only access to the
//! [`RouterStore`], and returns an [`Outcome`]:
//!
//! - `Proceed(event)` - pass the (possibly rewritten) event on
//! - `Redirect(navigation)` - abandon the current navigation for another
//! - `Cancel(reason)` - abandon the current navigation
//!
//! An `Err` is a genuine failure and ends the navigation with
//! `NAVIGATION_ERROR`.
//!
//! # Example
//! ```rust,ignore
//! use little_router::middleware::{transform_event_type, transform_config_load};
//! use little_router::{EventType, Outcome};
//!
//! // Require login for every route under /admin
//! let auth = transform_event_type(EventType::NavigationActivating, |event, _store| async move {
//!     match event.navigation().pathname() {
//!         Some(path) if path.starts_with("/admin") => Ok(event.navigation().redirect_to("/login")),
//!         _ => Ok(Outcome::Proceed(event)),
//!     }
//! });
//!
//! // Tag every lazily loaded route
//! let tag = transform_config_load(|config| config.data(serde_json::json!({ "lazy": true })));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::events::{Event, EventType};
use crate::navigation::Outcome;
use crate::tree::{RouteConfig, RouterStore};
use crate::RouterResult;

/// Middleware function type
pub type MiddlewareFn = Arc<
    dyn Fn(Event, Arc<RouterStore>) -> Pin<Box<dyn Future<Output = RouterResult<Outcome<Event>>> + Send>>
        + Send
        + Sync,
>;

/// Trait for implementing custom middleware
pub trait Middleware: Send + Sync {
    /// Event types this middleware handles; `None` means every type
    fn event_types(&self) -> Option<Vec<EventType>> {
        None
    }

    /// Process the event
    fn handle(
        &self,
        event: Event,
        store: Arc<RouterStore>,
    ) -> Pin<Box<dyn Future<Output = RouterResult<Outcome<Event>>> + Send>>;
}

/// A middleware function together with the event types it is interested in.
#[derive(Clone)]
pub struct Registered {
    pub(crate) event_types: Option<Vec<EventType>>,
    pub(crate) handler: MiddlewareFn,
}

impl Registered {
    /// Handle every event type.
    pub fn all(handler: MiddlewareFn) -> Self {
        Self {
            event_types: None,
            handler,
        }
    }

    /// Handle only `event_types`.
    pub fn only(event_types: impl IntoIterator<Item = EventType>, handler: MiddlewareFn) -> Self {
        Self {
            event_types: Some(event_types.into_iter().collect()),
            handler,
        }
    }

    /// Returns true if this middleware wants events of `event_type`.
    pub fn handles(&self, event_type: EventType) -> bool {
        self.event_types
            .as_ref()
            .is_none_or(|types| types.contains(&event_type))
    }
}

impl std::fmt::Debug for Registered {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registered")
            .field("event_types", &self.event_types)
            .finish()
    }
}

impl<M: Middleware + 'static> From<M> for Registered {
    fn from(middleware: M) -> Self {
        let event_types = middleware.event_types();
        let middleware = Arc::new(middleware);
        let handler: MiddlewareFn = Arc::new(move |event, store| middleware.handle(event, store));
        Self {
            event_types,
            handler,
        }
    }
}

/// Create middleware from an async function handling every event
///
/// # Example
/// ```rust,ignore
/// let log = from_fn(|event, _store| async move {
///     println!("{} #{}", event.event_type(), event.sequence());
///     Ok(Outcome::Proceed(event))
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> Registered
where
    F: Fn(Event, Arc<RouterStore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RouterResult<Outcome<Event>>> + Send + 'static,
{
    Registered::all(boxed(f))
}

/// Create middleware that only sees events of `event_type`; every other
/// event passes through untouched.
pub fn transform_event_type<F, Fut>(event_type: EventType, f: F) -> Registered
where
    F: Fn(Event, Arc<RouterStore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RouterResult<Outcome<Event>>> + Send + 'static,
{
    Registered::only([event_type], boxed(f))
}

/// Create middleware that maps `f` over every lazily loaded route
/// configuration (the `CHILDREN_CONFIG_LOAD` event).
pub fn transform_config_load<F>(f: F) -> Registered
where
    F: Fn(RouteConfig) -> RouteConfig + Send + Sync + 'static,
{
    let f = Arc::new(f);
    transform_event_type(EventType::ChildrenConfigLoad, move |event, _store| {
        let f = Arc::clone(&f);
        async move {
            let event = match event {
                Event::ChildrenConfigLoad {
                    navigation,
                    key,
                    configs,
                } => Event::ChildrenConfigLoad {
                    navigation,
                    key,
                    configs: configs.into_iter().map(|config| f(config)).collect(),
                },
                other => other,
            };
            Ok(Outcome::Proceed(event))
        }
    })
}

fn boxed<F, Fut>(f: F) -> MiddlewareFn
where
    F: Fn(Event, Arc<RouterStore>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = RouterResult<Outcome<Event>>> + Send + 'static,
{
    Arc::new(
        move |event: Event,
              store: Arc<RouterStore>|
              -> Pin<Box<dyn Future<Output = RouterResult<Outcome<Event>>> + Send>> {
            Box::pin(f(event, store))
        },
    )
}
