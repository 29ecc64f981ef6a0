//! Router facade with builder pattern
//!
//! The [`Router`] ties a [`History`] to the [`Scheduler`]: history changes
//! become navigations, and redirects coming out of guards or middleware are
//! written back to the history so the two never disagree.
//!
//! # Example
//! ```rust,ignore
//! let history = Arc::new(MemoryHistory::default());
//! let router = Router::builder(history)
//!     .routes([
//!         RouteConfig::new("").full(),
//!         RouteConfig::new("users").children([RouteConfig::new(":id")]),
//!     ])
//!     .middleware(transform_config_load(|config| config))
//!     .build()?;
//!
//! router.start().await?;
//! router.push("/users/42").await?;
//! assert_eq!(router.routes().last().unwrap().params["id"], "42");
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

use crate::config::RouterConfig;
use crate::events::Event;
use crate::history::{History, HistoryAction, HistoryListenerId};
use crate::href::{create_href, resolve_path, to_location};
use crate::location::{Href, Location, QueryPatch};
use crate::middleware::Registered;
use crate::navigation::{Navigation, NavigationDescriptor, NavigationType};
use crate::pipeline::Pipeline;
use crate::scheduler::{Completion, RedirectHandler, Scheduler, WeakScheduler};
use crate::sync::lock;
use crate::tree::{MatchResult, RouteConfig, RouterStore};
use crate::validation::RouteValidator;
use crate::RouterResult;

/// Options for [`Router::update_query`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateQueryOptions {
    /// Keep keys of the current query that the patch does not mention
    pub merge: bool,
}

impl UpdateQueryOptions {
    /// Merge the patch into the current query.
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// Builder for [`Router`].
pub struct RouterBuilder {
    history: Arc<dyn History>,
    routes: Vec<RouteConfig>,
    middleware: Vec<Registered>,
    config: RouterConfig,
}

impl std::fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("routes", &self.routes)
            .field("middleware", &self.middleware.len())
            .field("config", &self.config)
            .finish()
    }
}

impl RouterBuilder {
    /// Add top-level routes, in match order.
    pub fn routes(mut self, routes: impl IntoIterator<Item = RouteConfig>) -> Self {
        self.routes.extend(routes);
        self
    }

    /// Add a single top-level route.
    pub fn route(mut self, route: RouteConfig) -> Self {
        self.routes.push(route);
        self
    }

    /// Add a middleware. Middleware runs in the order it's added.
    pub fn middleware(mut self, middleware: impl Into<Registered>) -> Self {
        self.middleware.push(middleware.into());
        self
    }

    /// Set the configuration.
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and routes and build the router.
    ///
    /// The router does not observe the history until [`Router::start`].
    pub fn build(self) -> RouterResult<Router> {
        self.config.validate()?;
        RouteValidator::new(self.config.validate_routes).validate(&self.routes, &[])?;

        let store = Arc::new(RouterStore::with_routes(
            self.routes,
            self.config.matcher_cache_size,
        )?);
        let pipeline = Pipeline::new(self.middleware);
        tracing::debug!(
            middleware = pipeline.len(),
            validate_routes = self.config.validate_routes,
            "router built"
        );
        let scheduler = Scheduler::new(Arc::clone(&store), pipeline, &self.config);

        Ok(Router {
            inner: Arc::new(RouterInner {
                history: self.history,
                scheduler,
                store,
                listener: Mutex::new(None),
            }),
        })
    }
}

struct RouterInner {
    history: Arc<dyn History>,
    scheduler: Scheduler,
    store: Arc<RouterStore>,
    listener: Mutex<Option<HistoryListenerId>>,
}

impl Drop for RouterInner {
    fn drop(&mut self) {
        let listener = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = listener {
            self.history.unlisten(id);
        }
    }
}

/// Client-side router.
///
/// Cheap to clone; clones share the same scheduler, store and history.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("location", &self.location())
            .field("started", &self.is_started())
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}

impl Router {
    /// Start building a router over `history`.
    pub fn builder<H: History + 'static>(history: Arc<H>) -> RouterBuilder {
        let history: Arc<dyn History> = history;
        RouterBuilder {
            history,
            routes: Vec::new(),
            middleware: Vec::new(),
            config: RouterConfig::default(),
        }
    }

    /// Build a router with default configuration and no middleware.
    pub fn new<H: History + 'static>(
        history: Arc<H>,
        routes: impl IntoIterator<Item = RouteConfig>,
    ) -> RouterResult<Self> {
        Self::builder(history).routes(routes).build()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Observe the history and run the initial navigation.
    ///
    /// The initial navigation is a POP to the history's current location
    /// with sequence 0 and no transition. Calling `start` again waits for
    /// that same navigation.
    pub async fn start(&self) -> RouterResult<Completion> {
        let waiter = {
            let mut listener = lock(&self.inner.listener);
            if listener.is_some() {
                tracing::debug!("router already started");
                None
            } else {
                let scheduler = self.inner.scheduler.downgrade();
                *listener = Some(self.inner.history.listen(Arc::new(
                    move |location: &Location, action: HistoryAction| {
                        if let Some(scheduler) = scheduler.upgrade() {
                            let navigation =
                                scheduler.next_navigation(navigation_type(action), Some(location.clone()));
                            scheduler.dispatch(navigation);
                        }
                    },
                )));
                self.inner.scheduler.set_redirect_handler(Some(redirect_handler(
                    Arc::clone(&self.inner.history),
                    self.inner.scheduler.downgrade(),
                )));

                let initial = self.inner.history.location();
                tracing::debug!(pathname = %initial.pathname, "router started");
                let navigation: Navigation =
                    NavigationDescriptor::new(NavigationType::Pop, Some(initial))
                        .sequence(0)
                        .into();
                Some(self.inner.scheduler.dispatch(navigation))
            }
        };

        match waiter {
            Some(waiter) => waiter.wait().await,
            None => self.inner.scheduler.wait_for(0).wait().await,
        }
    }

    /// Stop observing the history. In-flight navigations still finish.
    pub fn stop(&self) {
        if let Some(id) = lock(&self.inner.listener).take() {
            self.inner.history.unlisten(id);
            self.inner.scheduler.set_redirect_handler(None);
            tracing::debug!("router stopped");
        }
    }

    /// Returns true between `start` and `stop`.
    pub fn is_started(&self) -> bool {
        lock(&self.inner.listener).is_some()
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Push a new history entry and wait for the resulting navigation.
    ///
    /// Relative string paths resolve against the committed pathname.
    pub async fn push(&self, to: impl Into<Href>) -> RouterResult<Completion> {
        let location = self.target(to.into())?;
        let waiter = self.inner.scheduler.wait_for(self.inner.scheduler.next_sequence());
        self.inner.history.push(location);
        waiter.wait().await
    }

    /// Replace the current history entry and wait for the resulting
    /// navigation.
    pub async fn replace(&self, to: impl Into<Href>) -> RouterResult<Completion> {
        let location = self.target(to.into())?;
        let waiter = self.inner.scheduler.wait_for(self.inner.scheduler.next_sequence());
        self.inner.history.replace(location);
        waiter.wait().await
    }

    /// Step back one history entry and wait for the resulting navigation.
    ///
    /// At the first entry there is nothing to pop; a `GO_BACK` navigation
    /// is dispatched directly and resolves to the root. The history entry
    /// itself is left as it is.
    pub async fn go_back(&self) -> RouterResult<Completion> {
        self.ensure_started()?;
        if !self.inner.history.can_go_back() {
            let scheduler = &self.inner.scheduler;
            let navigation = scheduler.next_navigation(NavigationType::GoBack, None);
            return scheduler.dispatch(navigation).wait().await;
        }
        let waiter = self.inner.scheduler.wait_for(self.inner.scheduler.next_sequence());
        self.inner.history.go_back();
        waiter.wait().await
    }

    /// Push the current location with its query patched.
    ///
    /// Without `merge` the patch replaces the query; with it, the patch is
    /// applied over the current query. Undefined keys are dropped either way.
    pub async fn update_query(
        &self,
        patch: QueryPatch,
        options: UpdateQueryOptions,
    ) -> RouterResult<Completion> {
        let current = self.location();
        let query = patch.apply(&current.query, options.merge);
        self.push(current.with_query(query)).await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Last committed location.
    pub fn location(&self) -> Location {
        self.inner.store.location()
    }

    /// Match chain of the last committed navigation.
    pub fn routes(&self) -> Vec<MatchResult> {
        self.inner.store.nodes()
    }

    /// Match chain committed before the current one.
    pub fn prev_routes(&self) -> Vec<MatchResult> {
        self.inner.store.prev_nodes()
    }

    /// The route store.
    pub fn store(&self) -> &Arc<RouterStore> {
        &self.inner.store
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// The history this router observes.
    pub fn history(&self) -> &Arc<dyn History> {
        &self.inner.history
    }

    /// Subscribe to navigation lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.scheduler.subscribe()
    }

    /// Resolve `path` against `cwd`, or against the committed pathname.
    pub fn resolve_path(&self, path: &str, cwd: Option<&str>) -> String {
        match cwd {
            Some(cwd) => resolve_path(path, cwd),
            None => resolve_path(path, &self.location().pathname),
        }
    }

    /// Build an href string; `None` yields `/`.
    pub fn create_href(&self, to: Option<Href>) -> String {
        create_href(to.as_ref())
    }

    fn ensure_started(&self) -> RouterResult<()> {
        if self.is_started() {
            Ok(())
        } else {
            Err(crate::RouterError::not_started())
        }
    }

    fn target(&self, href: Href) -> RouterResult<Location> {
        self.ensure_started()?;
        Ok(to_location(href, &self.location()))
    }
}

fn navigation_type(action: HistoryAction) -> NavigationType {
    match action {
        HistoryAction::Push => NavigationType::Push,
        HistoryAction::Pop => NavigationType::Pop,
        HistoryAction::Replace => NavigationType::Replace,
    }
}

/// Write redirects back to the history; its listener dispatches them.
fn redirect_handler(history: Arc<dyn History>, scheduler: WeakScheduler) -> RedirectHandler {
    Arc::new(move |navigation: Navigation| {
        match (navigation.navigation_type, navigation.to.clone()) {
            (NavigationType::Push, Some(to)) => history.push(to),
            (NavigationType::Replace, Some(to)) => history.replace(to),
            (NavigationType::GoBack, _) if history.can_go_back() => history.go_back(),
            _ => {
                if let Some(scheduler) = scheduler.upgrade() {
                    scheduler.dispatch(navigation);
                }
            }
        }
    })
}
