use async_trait::async_trait;
use dispatcher::{Action, Completion};
use serde_json::Value;

use crate::{Result, StateSnapshot};

/// What happened to an action handed to [`StateStore::dispatch`].
#[derive(Debug)]
pub enum Dispatched {
    /// The middleware queued it as a command or event.
    Routed(Completion),

    /// It went through the reducers. `changed` is true if any slice changed.
    Reduced { changed: bool },
}

impl Dispatched {
    /// Waits for a routed message to be processed. Reduced actions are
    /// already applied and return immediately.
    pub async fn settled(self) -> std::result::Result<(), dispatcher::DispatchError> {
        match self {
            Dispatched::Routed(completion) => completion.await,
            Dispatched::Reduced { .. } => Ok(()),
        }
    }
}

/// The hosting state container.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Returns a snapshot of the current state.
    async fn get_state(&self) -> StateSnapshot;

    /// Dispatches an action: command and event actions are routed to their
    /// dispatcher, everything else goes through the reducers.
    async fn dispatch(&self, action: Action) -> Result<Dispatched>;
}

/// Updates one slice of state in response to actions.
///
/// Reducers see every action that reaches the reducer path and ignore the
/// ones they do not know.
pub trait Reducer: Send + Sync + 'static {
    /// Name used in logs and errors.
    fn name(&self) -> &'static str;

    /// The slice this reducer owns.
    fn slice(&self) -> &'static str;

    /// Applies `action` to `state`. Returns true if the state changed.
    fn reduce(&self, state: &mut Value, action: &Action) -> serde_json::Result<bool>;
}
