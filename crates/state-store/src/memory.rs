use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError};

use async_trait::async_trait;
use common::Tag;
use dispatcher::{Action, Middleware, Routed};
use serde_json::{Map, Value};
use tokio::sync::{RwLock, broadcast};

use crate::{Dispatched, Reducer, Result, StateSnapshot, StateStore, StoreError};

const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// In-memory state store.
///
/// Holds named slices of JSON state. Actions dispatched to the store first
/// pass through the [`Middleware`] (once installed); whatever it hands back
/// is applied by the registered reducers. Clones share the same state.
#[derive(Clone)]
pub struct InMemoryStateStore {
    slices: Arc<RwLock<HashMap<String, Value>>>,
    reducers: Arc<std::sync::RwLock<Vec<Arc<dyn Reducer>>>>,
    middleware: Arc<OnceLock<Middleware>>,
    changes: broadcast::Sender<Tag>,
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStateStore {
    /// Creates an empty store with no reducers and no middleware.
    pub fn new() -> Self {
        Self::with_state(StateSnapshot::new())
    }

    /// Creates a store seeded with preloaded state.
    pub fn with_state(state: StateSnapshot) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            slices: Arc::new(RwLock::new(state.into_slices())),
            reducers: Arc::new(std::sync::RwLock::new(Vec::new())),
            middleware: Arc::new(OnceLock::new()),
            changes,
        }
    }

    /// Installs the middleware that routes command and event actions.
    ///
    /// Installed after construction because handlers behind the middleware
    /// usually need a handle to the store.
    pub fn install_middleware(&self, middleware: Middleware) -> Result<()> {
        self.middleware
            .set(middleware)
            .map_err(|_| StoreError::MiddlewareInstalled)
    }

    /// Returns the installed middleware, if any.
    pub fn middleware(&self) -> Option<&Middleware> {
        self.middleware.get()
    }

    /// Registers a reducer. Reducers run in registration order.
    pub fn add_reducer(&self, reducer: impl Reducer) {
        tracing::debug!(reducer = reducer.name(), slice = reducer.slice(), "reducer added");
        self.reducers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(reducer));
    }

    /// Subscribes to state changes. Each notification carries the tag of the
    /// action that changed the state.
    pub fn subscribe(&self) -> broadcast::Receiver<Tag> {
        self.changes.subscribe()
    }

    /// Runs an action through the reducers, skipping the middleware.
    #[tracing::instrument(skip(self, action), fields(tag = %action.tag))]
    pub async fn reduce(&self, action: &Action) -> Result<bool> {
        let reducers: Vec<Arc<dyn Reducer>> = self
            .reducers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut changed = false;
        {
            let mut slices = self.slices.write().await;

            // Reducers work on copies; nothing is committed unless all succeed.
            let mut staged: HashMap<String, Value> = HashMap::new();
            for reducer in &reducers {
                let slice = staged
                    .entry(reducer.slice().to_string())
                    .or_insert_with(|| {
                        slices
                            .get(reducer.slice())
                            .cloned()
                            .unwrap_or_else(|| Value::Object(Map::new()))
                    });
                changed |= reducer
                    .reduce(slice, action)
                    .map_err(|source| StoreError::Reducer {
                        reducer: reducer.name(),
                        source,
                    })?;
            }

            if changed {
                slices.extend(staged);
            }
        }

        if changed {
            tracing::debug!("state changed");
            // No subscribers is fine.
            let _ = self.changes.send(action.tag.clone());
        }

        Ok(changed)
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get_state(&self) -> StateSnapshot {
        StateSnapshot::from_slices(self.slices.read().await.clone())
    }

    async fn dispatch(&self, action: Action) -> Result<Dispatched> {
        let action = match self.middleware.get() {
            Some(middleware) => match middleware.handle(action) {
                Routed::Dispatched(completion) => return Ok(Dispatched::Routed(completion)),
                Routed::PassThrough(action) => action,
            },
            None => action,
        };

        let changed = self.reduce(&action).await?;
        Ok(Dispatched::Reduced { changed })
    }
}

#[cfg(test)]
mod tests {
    use dispatcher::{CommandDispatcher, EventDispatcher};
    use serde_json::json;

    use super::*;

    /// Stores the last payload of `SET_FILTER` actions.
    struct FilterReducer;

    impl Reducer for FilterReducer {
        fn name(&self) -> &'static str {
            "FilterReducer"
        }

        fn slice(&self) -> &'static str {
            "filter"
        }

        fn reduce(&self, state: &mut Value, action: &Action) -> serde_json::Result<bool> {
            if action.tag != "SET_FILTER" {
                return Ok(false);
            }
            let value: String = serde_json::from_value(action.payload.clone().unwrap_or_default())?;
            *state = Value::String(value);
            Ok(true)
        }
    }

    fn set_filter(value: Value) -> Action {
        let mut action = Action::new(Tag::new("SET_FILTER"));
        action.payload = Some(value);
        action
    }

    #[tokio::test]
    async fn reducer_actions_update_their_slice() {
        let store = InMemoryStateStore::new();
        store.add_reducer(FilterReducer);

        let dispatched = store.dispatch(set_filter(json!("DONE"))).await.unwrap();

        assert!(matches!(dispatched, Dispatched::Reduced { changed: true }));
        assert_eq!(store.get_state().await.slice("filter"), Some(&json!("DONE")));
    }

    #[tokio::test]
    async fn unknown_actions_leave_state_alone() {
        let store = InMemoryStateStore::new();
        store.add_reducer(FilterReducer);

        let dispatched = store
            .dispatch(Action::new(Tag::new("SOMETHING_ELSE")))
            .await
            .unwrap();

        assert!(matches!(dispatched, Dispatched::Reduced { changed: false }));
    }

    #[tokio::test]
    async fn reducer_errors_are_reported() {
        let store = InMemoryStateStore::new();
        store.add_reducer(FilterReducer);

        let err = store.dispatch(set_filter(json!(42))).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Reducer {
                reducer: "FilterReducer",
                ..
            }
        ));
    }

    /// Fails on every action.
    struct BrokenReducer;

    impl Reducer for BrokenReducer {
        fn name(&self) -> &'static str {
            "BrokenReducer"
        }

        fn slice(&self) -> &'static str {
            "audit"
        }

        fn reduce(&self, _state: &mut Value, _action: &Action) -> serde_json::Result<bool> {
            serde_json::from_str::<Value>("{").map(|_| false)
        }
    }

    #[tokio::test]
    async fn failed_reduction_leaves_state_untouched() {
        let store = InMemoryStateStore::new();
        store.add_reducer(FilterReducer);
        store.add_reducer(BrokenReducer);
        let mut changes = store.subscribe();

        let err = store.dispatch(set_filter(json!("DONE"))).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Reducer {
                reducer: "BrokenReducer",
                ..
            }
        ));
        let state = store.get_state().await;
        assert_eq!(state.slice("filter"), None);
        assert_eq!(state.slice("audit"), None);
        assert!(matches!(
            changes.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn subscribers_hear_about_changes() {
        let store = InMemoryStateStore::new();
        store.add_reducer(FilterReducer);
        let mut changes = store.subscribe();

        store.dispatch(set_filter(json!("ALL"))).await.unwrap();

        assert_eq!(changes.recv().await.unwrap(), Tag::new("SET_FILTER"));
    }

    #[tokio::test]
    async fn middleware_routes_commands_away_from_reducers() {
        let store = InMemoryStateStore::new();
        store.add_reducer(FilterReducer);
        store
            .install_middleware(Middleware::new(
                CommandDispatcher::new(),
                EventDispatcher::new(),
            ))
            .unwrap();

        let dispatched = store
            .dispatch(Action::new(Tag::new("LOGIN_USER_COMMAND")))
            .await
            .unwrap();

        let Dispatched::Routed(completion) = dispatched else {
            panic!("expected the command to be routed");
        };
        assert!(completion.await.unwrap_err().is_unhandled());
    }

    #[test]
    fn middleware_can_only_be_installed_once() {
        let store = InMemoryStateStore::new();
        let middleware = Middleware::new(CommandDispatcher::new(), EventDispatcher::new());

        store.install_middleware(middleware.clone()).unwrap();
        assert!(matches!(
            store.install_middleware(middleware),
            Err(StoreError::MiddlewareInstalled)
        ));
    }

    #[tokio::test]
    async fn preloaded_state_is_visible() {
        let state = StateSnapshot::new().with_slice("filter", json!("ALL"));
        let store = InMemoryStateStore::with_state(state.clone());

        assert_eq!(store.get_state().await, state);
    }
}
