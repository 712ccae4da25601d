//! Event emission handle given to aggregates.

use dispatcher::{Completion, Event, EventDispatcher, Message};

/// Lets an aggregate publish events without knowing about the store.
///
/// Cloning is cheap; clones feed the same event dispatcher.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    events: EventDispatcher,
}

impl EventSink {
    pub fn new(events: EventDispatcher) -> Self {
        Self { events }
    }

    /// Queues an event. The completion resolves once its handler has run.
    pub fn emit<E: Event>(&self, event: E) -> Completion {
        tracing::debug!(tag = %E::tag(), id = %event.id(), "emitting event");
        self.events.dispatch(event)
    }
}
