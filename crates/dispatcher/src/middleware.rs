//! Routes store actions into the command or event dispatcher.

use common::TagKind;

use crate::action::Action;
use crate::dispatcher::{CommandDispatcher, Completion, EventDispatcher};

/// Where an action should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// A command that still needs its handler.
    Command,
    /// An event that still needs its handler.
    Event,
    /// Anything else: the store's normal reducer path.
    PassThrough,
}

/// Decides the route of an action from its tag suffix and payload marker.
///
/// Actions carrying a payload are always reducer-bound, whatever their tag.
pub fn route(action: &Action) -> Route {
    if action.has_payload() {
        return Route::PassThrough;
    }

    match action.tag.kind() {
        Some(TagKind::Command) => Route::Command,
        Some(TagKind::Event) => Route::Event,
        None => Route::PassThrough,
    }
}

/// Result of running an action through the middleware.
#[derive(Debug)]
pub enum Routed {
    /// The action was queued on a dispatcher.
    Dispatched(Completion),
    /// The action was not a command or event; it is handed back unchanged.
    PassThrough(Action),
}

/// Store middleware holding the two dispatchers. It keeps no other state.
#[derive(Debug, Clone)]
pub struct Middleware {
    commands: CommandDispatcher,
    events: EventDispatcher,
}

impl Middleware {
    pub fn new(commands: CommandDispatcher, events: EventDispatcher) -> Self {
        Self { commands, events }
    }

    pub fn commands(&self) -> &CommandDispatcher {
        &self.commands
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Routes one action.
    pub fn handle(&self, action: Action) -> Routed {
        match route(&action) {
            Route::Command => Routed::Dispatched(self.commands.dispatch_action(action)),
            Route::Event => Routed::Dispatched(self.events.dispatch_action(action)),
            Route::PassThrough => Routed::PassThrough(action),
        }
    }

    /// Waits until both dispatchers are idle.
    ///
    /// Events emitted while commands drain are picked up by the second pass.
    pub async fn settle(&self) {
        loop {
            self.commands.idle().await;
            self.events.idle().await;
            if !self.commands.is_draining() && !self.events.is_draining() {
                return;
            }
        }
    }
}
