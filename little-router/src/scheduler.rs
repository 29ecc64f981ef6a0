//! Navigation scheduler
//!
//! The scheduler owns the "latest navigation" slot. Every dispatched
//! navigation runs on its own tokio task through these phases:
//!
//! ```text
//! IDLE -> MATCHING -> PIPELINE_RUNNING -> COMMITTING -> IDLE
//!            |              |
//!            +--------------+--> CANCELLED (not found, error, guard cancel)
//! ```
//!
//! Dispatch never waits for older navigations. Instead, each continuation
//! re-checks that its navigation is still the latest before touching
//! shared state, and a superseded navigation quietly stops. Commits are
//! therefore monotonic in sequence.
//!
//! A redirect (from a guard or middleware) abandons the current navigation
//! and hands the derived one to the redirect handler; without a handler the
//! scheduler dispatches it itself.

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock, Weak};
use tokio::sync::{broadcast, oneshot};

use crate::config::RouterConfig;
use crate::events::Event;
use crate::location::Location;
use crate::navigation::{Navigation, NavigationDescriptor, NavigationType, Outcome};
use crate::pipeline::Pipeline;
use crate::sync::{lock, read, write};
use crate::tree::{Children, Guard, MatchResult, RouteNode, RouterStore, resolve};
use crate::validation::RouteValidator;
use crate::{RouterError, RouterErrorCode, RouterResult};

/// Lifecycle log at `debug` when verbose logging is on, `trace` otherwise.
macro_rules! lifecycle {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            tracing::debug!($($arg)+);
        } else {
            tracing::trace!($($arg)+);
        }
    };
}

/// Unwrap a `Proceed`, or end the navigation with the short-circuit.
macro_rules! proceed {
    ($outcome:expr) => {
        match $outcome {
            Outcome::Proceed(value) => value,
            Outcome::Redirect(next) => return Ok(Flow::Redirected(next)),
            Outcome::Cancel(reason) => return Ok(Flow::Cancelled(reason)),
        }
    };
}

/// State machine phase of the latest navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    Matching,
    PipelineRunning,
    Committing,
    Cancelled,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Matching => write!(f, "MATCHING"),
            Self::PipelineRunning => write!(f, "PIPELINE_RUNNING"),
            Self::Committing => write!(f, "COMMITTING"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// How a navigation (or the one that replaced it) ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The navigation was committed to the store
    Committed { sequence: u64, location: Location },
    /// A guard or middleware cancelled the navigation
    Prevented { sequence: u64, reason: String },
}

impl Completion {
    /// Sequence of the navigation that settled the waiter.
    pub fn sequence(&self) -> u64 {
        match self {
            Self::Committed { sequence, .. } | Self::Prevented { sequence, .. } => *sequence,
        }
    }

    /// Returns true if the navigation was committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// Receives redirect navigations in place of the scheduler.
pub type RedirectHandler = Arc<dyn Fn(Navigation) + Send + Sync>;

/// Pending completion of a dispatched navigation.
#[derive(Debug)]
pub struct NavigationWaiter {
    sequence: u64,
    receiver: oneshot::Receiver<RouterResult<Completion>>,
}

impl NavigationWaiter {
    /// Sequence this waiter was registered for.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Wait for the outcome of the first navigation with a sequence at least
    /// this waiter's that ends while being the latest.
    pub async fn wait(self) -> RouterResult<Completion> {
        self.receiver
            .await
            .unwrap_or_else(|_| Err(RouterError::internal("Scheduler dropped before settling")))
    }
}

enum Flow {
    Committed(Location),
    Redirected(Navigation),
    Cancelled(String),
    Stale,
}

type Settled = (u64, RouterResult<Completion>);

struct SchedulerState {
    latest: Option<Navigation>,
    phase: Phase,
    waiters: Vec<(u64, oneshot::Sender<RouterResult<Completion>>)>,
    last_settled: Option<Settled>,
}

struct Inner {
    store: Arc<RouterStore>,
    pipeline: Pipeline,
    validator: RouteValidator,
    events: broadcast::Sender<Event>,
    state: Mutex<SchedulerState>,
    redirect_handler: RwLock<Option<RedirectHandler>>,
    verbose: bool,
}

/// Sequences navigations and drives them through matching, the middleware
/// pipeline, guards and commit.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

/// Non-owning handle to a [`Scheduler`].
#[derive(Clone)]
pub struct WeakScheduler {
    inner: Weak<Inner>,
}

impl WeakScheduler {
    /// Upgrade to a scheduler if it is still alive.
    pub fn upgrade(&self) -> Option<Scheduler> {
        self.inner.upgrade().map(|inner| Scheduler { inner })
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("latest_sequence", &self.latest_sequence())
            .field("phase", &self.phase())
            .field("pipeline", &self.inner.pipeline)
            .finish()
    }
}

impl Scheduler {
    /// Create a scheduler over `store`.
    pub fn new(store: Arc<RouterStore>, pipeline: Pipeline, config: &RouterConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer.max(1));
        Self {
            inner: Arc::new(Inner {
                store,
                pipeline,
                validator: RouteValidator::new(config.validate_routes),
                events,
                state: Mutex::new(SchedulerState {
                    latest: None,
                    phase: Phase::Idle,
                    waiters: Vec::new(),
                    last_settled: None,
                }),
                redirect_handler: RwLock::new(None),
                verbose: config.debug_logging,
            }),
        }
    }

    /// Non-owning handle, for callbacks the scheduler itself holds.
    pub fn downgrade(&self) -> WeakScheduler {
        WeakScheduler {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The store navigations commit to.
    pub fn store(&self) -> &Arc<RouterStore> {
        &self.inner.store
    }

    /// Subscribe to lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.inner.events.subscribe()
    }

    /// Install (or clear) the redirect handler.
    pub fn set_redirect_handler(&self, handler: Option<RedirectHandler>) {
        *write(&self.inner.redirect_handler) = handler;
    }

    /// Phase of the latest navigation.
    pub fn phase(&self) -> Phase {
        lock(&self.inner.state).phase
    }

    /// Sequence of the latest dispatched navigation.
    pub fn latest_sequence(&self) -> Option<u64> {
        lock(&self.inner.state)
            .latest
            .as_ref()
            .map(|navigation| navigation.sequence)
    }

    /// Sequence the next dispatched navigation will get.
    pub fn next_sequence(&self) -> u64 {
        self.latest_sequence().map_or(0, |sequence| sequence + 1)
    }

    /// Derive the next navigation from the latest one.
    pub fn next_navigation(&self, navigation_type: NavigationType, to: Option<Location>) -> Navigation {
        let descriptor = NavigationDescriptor::new(navigation_type, to);
        match &lock(&self.inner.state).latest {
            Some(latest) => latest.next(descriptor),
            None => descriptor.into(),
        }
    }

    /// Start processing `navigation` and return a waiter for its outcome.
    ///
    /// A navigation whose sequence does not exceed the latest one is moved
    /// past it, so sequences stay strictly increasing. Must be called from
    /// within a tokio runtime.
    pub fn dispatch(&self, mut navigation: Navigation) -> NavigationWaiter {
        let (sender, receiver) = oneshot::channel();
        {
            let mut state = lock(&self.inner.state);
            if let Some(latest) = &state.latest {
                if navigation.sequence <= latest.sequence {
                    tracing::debug!(
                        sequence = navigation.sequence,
                        latest = latest.sequence,
                        "navigation sequence bumped"
                    );
                    navigation.sequence = latest.sequence + 1;
                }
            }
            state.latest = Some(navigation.clone());
            state.phase = Phase::Matching;
            state.waiters.push((navigation.sequence, sender));
        }

        tracing::debug!(
            sequence = navigation.sequence,
            navigation_type = %navigation.navigation_type,
            pathname = navigation.pathname().unwrap_or_default(),
            "navigation dispatched"
        );

        let sequence = navigation.sequence;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(navigation).await });

        NavigationWaiter { sequence, receiver }
    }

    /// Waiter for the first navigation with sequence >= `sequence` to end.
    ///
    /// Settles immediately if such a navigation already ended.
    pub fn wait_for(&self, sequence: u64) -> NavigationWaiter {
        let (sender, receiver) = oneshot::channel();
        let mut state = lock(&self.inner.state);
        let settled = state
            .last_settled
            .clone()
            .filter(|(settled, _)| *settled >= sequence);
        match settled {
            Some((_, result)) => {
                let _ = sender.send(result);
            }
            None => state.waiters.push((sequence, sender)),
        }
        NavigationWaiter { sequence, receiver }
    }
}

// =============================================================================
// Navigation processing
// =============================================================================

impl Inner {
    async fn run(self: Arc<Self>, navigation: Navigation) {
        let sequence = navigation.sequence;
        let flow = Arc::clone(&self).drive(navigation.clone()).await;

        match flow {
            Ok(Flow::Committed(location)) => {
                lifecycle!(self.verbose, sequence, pathname = %location.pathname, "navigation committed");
                self.settle(sequence, Ok(Completion::Committed { sequence, location }), Phase::Idle);
            }
            Ok(Flow::Stale) => {
                tracing::debug!(sequence, "stale navigation discarded");
            }
            Ok(Flow::Cancelled(reason)) => {
                if !self.is_latest(sequence) {
                    return;
                }
                lifecycle!(self.verbose, sequence, reason = %reason, "navigation cancelled");
                self.emit_terminal(Event::NavigationCancelled {
                    navigation,
                    next_navigation: None,
                    reason: Some(reason.clone()),
                })
                .await;
                self.settle(sequence, Ok(Completion::Prevented { sequence, reason }), Phase::Cancelled);
            }
            Ok(Flow::Redirected(next)) => {
                if !self.is_latest(sequence) {
                    return;
                }
                lifecycle!(
                    self.verbose,
                    sequence,
                    next_sequence = next.sequence,
                    navigation_type = %next.navigation_type,
                    "navigation redirected"
                );
                self.emit_terminal(Event::NavigationCancelled {
                    navigation,
                    next_navigation: Some(next.clone()),
                    reason: None,
                })
                .await;
                self.redirect(next);
            }
            Err(error) => {
                if !self.is_latest(sequence) {
                    return;
                }
                tracing::warn!(sequence, code = %error.code, error = %error.message, "navigation failed");
                self.emit_terminal(Event::NavigationError {
                    navigation,
                    error: error.clone(),
                })
                .await;
                self.settle(sequence, Err(error), Phase::Cancelled);
            }
        }
    }

    async fn drive(self: Arc<Self>, navigation: Navigation) -> RouterResult<Flow> {
        let sequence = navigation.sequence;

        // Matching
        let event = proceed!(self.emit(Event::NavigationStart { navigation }).await?);
        let mut navigation = event.navigation().clone();
        if !self.is_latest(sequence) {
            return Ok(Flow::Stale);
        }

        let to = navigation.to.clone().unwrap_or_else(Location::root);
        navigation.to = Some(to.clone());

        let interrupt: Arc<Mutex<Option<Flow>>> = Arc::new(Mutex::new(None));
        let on_exhausted = {
            let inner = Arc::clone(&self);
            let navigation = navigation.clone();
            let interrupt = Arc::clone(&interrupt);
            move |node: Arc<RouteNode>| -> BoxFuture<'static, RouterResult<Vec<Arc<RouteNode>>>> {
                Arc::clone(&inner)
                    .expand(navigation.clone(), node, Arc::clone(&interrupt))
                    .boxed()
            }
        };

        let resolved = resolve(self.store.root(), &to.pathname, &on_exhausted).await;
        if let Some(flow) = lock(&interrupt).take() {
            return Ok(flow);
        }
        let chain = resolved?;
        if !self.is_latest(sequence) {
            return Ok(Flow::Stale);
        }

        // Pipeline
        self.set_phase(sequence, Phase::PipelineRunning);
        let navigation = navigation.with_leaf(chain.last().cloned());
        let (navigation, chain) = split(proceed!(
            self.emit(Event::NavigationResultMatched { navigation, chain })
                .await?
        ));
        if !self.is_latest(sequence) {
            return Ok(Flow::Stale);
        }

        let (navigation, chain) = split(proceed!(
            self.emit(Event::NavigationActivating { navigation, chain })
                .await?
        ));
        if !self.is_latest(sequence) {
            return Ok(Flow::Stale);
        }

        proceed!(self.run_guards(&navigation, &chain).await?);
        if !self.is_latest(sequence) {
            return Ok(Flow::Stale);
        }

        // Commit
        self.set_phase(sequence, Phase::Committing);
        let location = navigation.to.clone().unwrap_or(to);
        if !self.store.commit(sequence, location.clone(), chain.clone()) {
            return Ok(Flow::Stale);
        }

        // Past the commit point the navigation can no longer be cancelled.
        let event = self
            .emit_terminal(Event::NavigationActivated { navigation, chain })
            .await;
        let navigation = event.navigation().clone();
        self.emit_terminal(Event::NavigationEnd { navigation }).await;

        Ok(Flow::Committed(location))
    }

    /// Expand a lazy node reached while matching `navigation`.
    async fn expand(
        self: Arc<Self>,
        navigation: Navigation,
        node: Arc<RouteNode>,
        interrupt: Arc<Mutex<Option<Flow>>>,
    ) -> RouterResult<Vec<Arc<RouteNode>>> {
        let Children::Lazy(lazy) = &node.children else {
            return Ok(node.children.resolved().to_vec());
        };
        if let Some(current) = self.store.get(&node.key) {
            if let Children::Resolved(children) = &current.children {
                return Ok(children.clone());
            }
        }

        let sequence = navigation.sequence;
        let key = node.key.clone();
        lifecycle!(self.verbose, sequence, node_key = %key, "loading lazy children");

        let request = Event::ChildrenConfigRequest {
            navigation: navigation.clone(),
            key: key.clone(),
        };
        self.interruptible(request, &interrupt).await?;

        let configs = lazy.load().await.map_err(|error| {
            if error.code == RouterErrorCode::LoaderFailed {
                error
            } else {
                RouterError::loader_failed(format!("Failed to load children of '{}'", key))
                    .with_cause(error.to_string())
            }
        })?;
        if !self.is_latest(sequence) {
            *lock(&interrupt) = Some(Flow::Stale);
            return Err(RouterError::internal("Navigation superseded"));
        }

        let load = Event::ChildrenConfigLoad {
            navigation: navigation.clone(),
            key: key.clone(),
            configs,
        };
        let configs = match self.interruptible(load, &interrupt).await? {
            Event::ChildrenConfigLoad { configs, .. } => configs,
            _ => Vec::new(),
        };

        let inherited: Vec<String> = self
            .store
            .path_to(&key)
            .unwrap_or_default()
            .iter()
            .flat_map(|ancestor| ancestor.matcher().param_names().to_vec())
            .collect();
        self.validator.validate(&configs, &inherited)?;

        let children = self.store.expand_children(&key, configs)?;
        self.interruptible(
            Event::ChildrenLoad {
                navigation,
                key,
                children: children.clone(),
            },
            &interrupt,
        )
        .await?;

        Ok(children)
    }

    /// Run `can_deactivate` for nodes leaving the active chain (deepest
    /// first), then `can_activate` for nodes entering it (root first).
    async fn run_guards(&self, navigation: &Navigation, chain: &[MatchResult]) -> RouterResult<Outcome> {
        let current = self.store.nodes();
        let shared = current
            .iter()
            .zip(chain)
            .take_while(|(active, next)| active.key() == next.key() && active.params == next.params)
            .count();

        let leaving = current[shared..]
            .iter()
            .rev()
            .filter_map(|m| m.node.can_deactivate.as_ref().map(|guard| (guard, m)));
        let entering = chain[shared..]
            .iter()
            .filter_map(|m| m.node.can_activate.as_ref().map(|guard| (guard, m)));

        for (guard, matched) in leaving.chain(entering) {
            let outcome = call_guard(guard, navigation, matched).await?;
            if !outcome.is_proceed() {
                lifecycle!(
                    self.verbose,
                    sequence = navigation.sequence,
                    node_key = %matched.key(),
                    "guard short-circuited"
                );
                return Ok(outcome);
            }
        }
        Ok(Outcome::Proceed(()))
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn emit(&self, event: Event) -> RouterResult<Outcome<Event>> {
        lifecycle!(self.verbose, sequence = event.sequence(), event_type = %event.event_type(), "event");
        let outcome = self.pipeline.run(event, &self.store).await?;
        if let Outcome::Proceed(event) = &outcome {
            self.broadcast(event.clone());
        }
        Ok(outcome)
    }

    /// Emit an event whose outcome is already decided.
    ///
    /// Short-circuits and middleware failures are logged and ignored; the
    /// returned event is the rewritten one, or `event` itself otherwise.
    async fn emit_terminal(&self, event: Event) -> Event {
        let event_type = event.event_type();
        match self.emit(event.clone()).await {
            Ok(Outcome::Proceed(event)) => event,
            Ok(_) => {
                tracing::debug!(event_type = %event_type, "short-circuit ignored for terminal event");
                event
            }
            Err(error) => {
                tracing::warn!(event_type = %event_type, error = %error, "terminal event middleware failed");
                event
            }
        }
    }

    /// Emit during lazy expansion, recording a short-circuit in `interrupt`.
    async fn interruptible(&self, event: Event, interrupt: &Mutex<Option<Flow>>) -> RouterResult<Event> {
        let flow = match self.emit(event).await? {
            Outcome::Proceed(event) => return Ok(event),
            Outcome::Redirect(next) => Flow::Redirected(next),
            Outcome::Cancel(reason) => Flow::Cancelled(reason),
        };
        *lock(interrupt) = Some(flow);
        Err(RouterError::internal("Navigation interrupted"))
    }

    fn broadcast(&self, event: Event) {
        if self.events.send(event).is_err() {
            tracing::trace!("no event subscribers");
        }
    }

    fn redirect(self: &Arc<Self>, next: Navigation) {
        let handler = read(&self.redirect_handler).clone();
        match handler {
            Some(handler) => handler(next),
            None => {
                Scheduler {
                    inner: Arc::clone(self),
                }
                .dispatch(next);
            }
        }
    }

    fn is_latest(&self, sequence: u64) -> bool {
        lock(&self.state)
            .latest
            .as_ref()
            .is_some_and(|latest| latest.sequence == sequence)
    }

    fn set_phase(&self, sequence: u64, phase: Phase) {
        let mut state = lock(&self.state);
        if state.latest.as_ref().is_some_and(|latest| latest.sequence == sequence) {
            tracing::trace!(sequence, phase = %phase, "phase transition");
            state.phase = phase;
        }
    }

    /// Settle every waiter registered at or below `sequence`.
    ///
    /// A commit always settles. Other outcomes only settle while the
    /// navigation is still the latest; otherwise the newer one will.
    fn settle(&self, sequence: u64, result: RouterResult<Completion>, phase: Phase) {
        let ready = {
            let mut state = lock(&self.state);
            let latest = state
                .latest
                .as_ref()
                .is_some_and(|latest| latest.sequence == sequence);
            let committed = matches!(result, Ok(Completion::Committed { .. }));
            if !latest && !committed {
                return;
            }
            if latest {
                state.phase = phase;
            }
            if state
                .last_settled
                .as_ref()
                .is_none_or(|(settled, _)| *settled <= sequence)
            {
                state.last_settled = Some((sequence, result.clone()));
            }

            let (ready, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut state.waiters)
                .into_iter()
                .partition(|(waiting_for, _)| *waiting_for <= sequence);
            state.waiters = pending;
            ready
        };

        for (_, sender) in ready {
            let _ = sender.send(result.clone());
        }
    }
}

async fn call_guard(guard: &Guard, navigation: &Navigation, matched: &MatchResult) -> RouterResult<Outcome> {
    guard(navigation.clone(), matched.clone()).await.map_err(|error| {
        if error.code == RouterErrorCode::Middleware {
            error
        } else {
            let cause = error.to_string();
            RouterError::middleware(error.message).with_cause(cause)
        }
    })
}

fn split(event: Event) -> (Navigation, Vec<MatchResult>) {
    let navigation = event.navigation().clone();
    let chain = event.chain().map(<[MatchResult]>::to_vec).unwrap_or_default();
    (navigation, chain)
}
