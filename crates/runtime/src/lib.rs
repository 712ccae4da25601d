//! Wiring, configuration and observability for the CQRS messaging layer.
//!
//! [`App`] assembles the state store, both dispatchers, the middleware and
//! the item handlers. [`run_demo`] drives a short item lifecycle through it.

pub mod config;
pub mod error;
pub mod telemetry;

use common::{EntityId, Tag};
use dispatcher::{Action, CommandDispatcher, EventDispatcher, Message, Middleware};
use domain::{
    AdjustItemQuantityCommand, ArchiveItemCommand, CreateItemCommand, ItemReducer, OwnerId,
    RenameItemCommand, register_handlers,
};
use serde_json::Value;
use state_store::{Dispatched, InMemoryStateStore, StateStore};

pub use config::{Config, LogFormat};
pub use error::{AppError, ConfigError};

/// The assembled application.
#[derive(Clone)]
pub struct App {
    store: InMemoryStateStore,
    middleware: Middleware,
}

impl App {
    /// Builds the store and dispatchers and registers the item domain.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let store = InMemoryStateStore::new();
        store.add_reducer(ItemReducer);

        let commands = CommandDispatcher::with_config(config.dispatcher_config());
        let events = EventDispatcher::with_config(config.dispatcher_config());
        register_handlers(&commands, &events, &store)?;

        let middleware = Middleware::new(commands, events);
        store.install_middleware(middleware.clone())?;

        tracing::info!(
            commands = middleware.commands().handler_count(),
            events = middleware.events().handler_count(),
            "application wired"
        );

        Ok(Self { store, middleware })
    }

    pub fn store(&self) -> &InMemoryStateStore {
        &self.store
    }

    pub fn middleware(&self) -> &Middleware {
        &self.middleware
    }

    /// Sends a typed message through the store's `dispatch`.
    pub async fn send<M: Message>(&self, message: &M) -> Result<Dispatched, AppError> {
        let action = Action::from_message(message)?;
        Ok(self.store.dispatch(action).await?)
    }

    /// Sends a message and waits for its outcome.
    pub async fn execute<M: Message>(&self, message: &M) -> Result<(), AppError> {
        self.send(message).await?.settled().await?;
        Ok(())
    }

    /// Waits until both dispatchers are idle.
    pub async fn settle(&self) {
        self.middleware.settle().await;
    }

    /// Returns the current `item` slice.
    pub async fn items(&self) -> Value {
        self.store
            .get_state()
            .await
            .slice(ItemReducer::SLICE)
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }
}

/// Runs a short item lifecycle through the store and returns the item id.
///
/// The lifecycle includes one rule violation and one message nobody handles;
/// both are reported and the run carries on.
pub async fn run_demo(app: &App) -> Result<EntityId, AppError> {
    let create = CreateItemCommand::new("Desk lamp", Some(OwnerId::new()), 2);
    let item_id = create.item_id;

    app.execute(&create).await?;
    app.execute(&RenameItemCommand::new(item_id, "Brass desk lamp"))
        .await?;
    app.execute(&AdjustItemQuantityCommand::new(item_id, 5)).await?;

    if let Err(error) = app
        .execute(&AdjustItemQuantityCommand::new(item_id, -100))
        .await
    {
        tracing::info!(%error, "oversized withdrawal rejected");
    }

    // Both are queued before either is awaited.
    let unknown = app
        .store()
        .dispatch(Action::new(Tag::new("REORDER_ITEM_COMMAND")))
        .await?;
    let archive = app.send(&ArchiveItemCommand::new(item_id)).await?;
    for dispatched in [unknown, archive] {
        if let Dispatched::Routed(completion) = dispatched {
            let tag = completion.tag().clone();
            if let Err(error) = completion.await {
                tracing::info!(%tag, %error, "demo message did not succeed");
            }
        }
    }

    app.settle().await;
    Ok(item_id)
}
