//! Ordered middleware pipeline with an event-type dispatch table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::events::{Event, EventType};
use crate::middleware::{MiddlewareFn, Registered};
use crate::navigation::Outcome;
use crate::tree::RouterStore;
use crate::{RouterError, RouterErrorCode, RouterResult};

/// Middleware chain, pre-sorted by event type.
///
/// Each event type maps to the handlers interested in it, in registration
/// order, so running an event never visits an uninterested middleware.
#[derive(Clone, Default)]
pub struct Pipeline {
    table: HashMap<EventType, Vec<MiddlewareFn>>,
    registered: usize,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<EventType, usize> =
            self.table.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("Pipeline")
            .field("registered", &self.registered)
            .field("handlers", &counts)
            .finish()
    }
}

impl Pipeline {
    /// Build a pipeline from middleware in application order.
    pub fn new(middleware: impl IntoIterator<Item = Registered>) -> Self {
        middleware
            .into_iter()
            .fold(Self::default(), |pipeline, m| pipeline.with(m))
    }

    /// Append a middleware.
    pub fn with(mut self, middleware: Registered) -> Self {
        for event_type in EventType::ALL {
            if middleware.handles(event_type) {
                self.table
                    .entry(event_type)
                    .or_default()
                    .push(Arc::clone(&middleware.handler));
            }
        }
        self.registered += 1;
        self
    }

    /// Number of registered middleware.
    pub fn len(&self) -> usize {
        self.registered
    }

    /// Returns true if no middleware is registered.
    pub fn is_empty(&self) -> bool {
        self.registered == 0
    }

    /// Number of handlers that will see events of `event_type`.
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.table.get(&event_type).map_or(0, Vec::len)
    }

    /// Run `event` through every interested middleware, left to right.
    ///
    /// Stops at the first `Redirect` or `Cancel`. A handler may rewrite the
    /// event but not change its type. Failures are reported as `MIDDLEWARE`
    /// errors.
    pub async fn run(&self, event: Event, store: &Arc<RouterStore>) -> RouterResult<Outcome<Event>> {
        let event_type = event.event_type();
        let Some(handlers) = self.table.get(&event_type) else {
            return Ok(Outcome::Proceed(event));
        };

        let mut event = event;
        for (index, handler) in handlers.iter().enumerate() {
            tracing::trace!(event_type = %event_type, index, "running middleware");
            match handler(event, Arc::clone(store)).await.map_err(into_middleware_error)? {
                Outcome::Proceed(next) if next.event_type() == event_type => event = next,
                Outcome::Proceed(next) => {
                    return Err(RouterError::middleware(format!(
                        "Middleware changed a {} event into {}",
                        event_type,
                        next.event_type()
                    )));
                }
                other => {
                    tracing::debug!(event_type = %event_type, index, "middleware short-circuited");
                    return Ok(other);
                }
            }
        }
        Ok(Outcome::Proceed(event))
    }
}

fn into_middleware_error(error: RouterError) -> RouterError {
    if error.code == RouterErrorCode::Middleware {
        return error;
    }
    let cause = error.to_string();
    RouterError::middleware(error.message).with_cause(cause)
}
