//! # Little Router
//!
//! An asynchronous client-side router: a route matching tree with lazily
//! loaded subtrees, a middleware pipeline over navigation lifecycle events,
//! and a scheduler that keeps concurrent navigations from committing out of
//! order.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  push/replace/back  ┌──────────────┐
//! │ Router       │────────────────────▶│ History      │
//! │ facade       │◀────────────────────│ collaborator │
//! └──────┬───────┘   change listener   └──────────────┘
//!        │ dispatch(Navigation)
//!        ▼
//! ┌──────────────┐  events  ┌──────────────┐
//! │ Scheduler    │─────────▶│ Pipeline     │──▶ broadcast subscribers
//! └──────┬───────┘          └──────────────┘
//!        │ resolve / expand / commit
//!        ▼
//! ┌──────────────┐
//! │ RouterStore  │  persistent route tree + key cache + active chain
//! └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use little_router::prelude::*;
//! use std::sync::Arc;
//!
//! let history = Arc::new(MemoryHistory::default());
//! let router = Router::builder(history.clone())
//!     .routes([
//!         RouteConfig::new("").full(),
//!         RouteConfig::new("users").children([
//!             RouteConfig::new(":id").can_activate(|navigation, matched| async move {
//!                 if matched.params["id"] == "0" {
//!                     return Ok(navigation.redirect_to("/"));
//!                 }
//!                 Ok(Outcome::Proceed(()))
//!             }),
//!         ]),
//!         RouteConfig::new("admin").load_children(|| async {
//!             Ok(vec![RouteConfig::new("settings")])
//!         }),
//!     ])
//!     .build()?;
//!
//! router.start().await?;
//! router.push("/users/42").await?;
//! router.update_query(QueryPatch::new().set("tab", "posts"), UpdateQueryOptions::merge()).await?;
//! assert_eq!(router.location().href(), "/users/42?tab=posts");
//! ```
//!
//! ## Observing Navigations
//!
//! Every lifecycle step flows through the middleware pipeline and is then
//! broadcast:
//!
//! ```rust,ignore
//! let mut events = router.events();
//! while let Ok(event) = events.recv().await {
//!     println!("#{} {}", event.sequence(), event.event_type());
//! }
//! ```

mod config;
mod error;
pub mod events;
pub mod history;
pub mod href;
pub mod location;
pub mod middleware;
pub mod navigation;
pub mod pipeline;
mod router;
pub mod scheduler;
mod sync;
pub mod tree;
pub mod validation;

#[cfg(test)]
mod tests;

// Public API
pub use config::{ConfigValidationError, RouterConfig};
pub use error::{RouterError, RouterErrorCode, RouterResult};
pub use events::{Event, EventType};
pub use history::{History, HistoryAction, HistoryListener, HistoryListenerId, MemoryHistory};
pub use href::{create_href, resolve_path};
pub use location::{
    Href, Location, LocationDescriptor, Query, QueryInput, QueryPatch, parse_query,
    stringify_query,
};
pub use middleware::{
    Middleware, MiddlewareFn, Registered, from_fn, transform_config_load, transform_event_type,
};
pub use navigation::{Navigation, NavigationDescriptor, NavigationType, Outcome};
pub use pipeline::Pipeline;
pub use router::{Router, RouterBuilder, UpdateQueryOptions};
pub use scheduler::{Completion, NavigationWaiter, Phase, RedirectHandler, Scheduler};
pub use tree::{
    MatchMode, MatchResult, NodeKey, NodeUpdate, Params, RouteConfig, RouteNode, RouterStore,
    StoreChange,
};
pub use validation::{RouteValidator, ValidationError};

/// Prelude for convenient imports
///
/// ```rust,ignore
/// use little_router::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Completion, Event, EventType, History, Href, Location, LocationDescriptor, MatchMode,
        MatchResult, MemoryHistory, Navigation, NavigationType, Outcome, QueryPatch, RouteConfig,
        Router, RouterConfig, RouterError, RouterErrorCode, RouterResult, UpdateQueryOptions,
        from_fn, transform_config_load, transform_event_type,
    };
}
