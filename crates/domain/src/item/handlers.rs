//! Item command and event handlers.
//!
//! Command handlers hydrate the [`Item`] from the store and run one business
//! method on it. Event handlers turn item events into [`ItemReducer`] upserts.

use async_trait::async_trait;
use common::EntityId;
use dispatcher::{Handler, HandlerResult};
use state_store::{HydrationError, StateStore, hydrate_from_store};

use crate::EventSink;

use super::{
    AdjustItemQuantityCommand, ArchiveItemCommand, CreateItemCommand, Item, ItemArchivedEvent,
    ItemCreatedEvent, ItemRecord, ItemReducer, ItemUpdatedEvent, RenameItemCommand,
};

async fn load<S: StateStore>(
    store: &S,
    id: EntityId,
    events: &EventSink,
) -> Result<Item, HydrationError> {
    hydrate_from_store::<Item, S>(store, id, events.clone()).await
}

async fn upsert<S: StateStore>(store: &S, patch: ItemRecord) -> HandlerResult {
    store.dispatch(ItemReducer::upsert(&patch)?).await?;
    Ok(())
}

macro_rules! command_handler {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<S> {
            store: S,
            events: EventSink,
        }

        impl<S: StateStore> $name<S> {
            pub fn new(store: S, events: EventSink) -> Self {
                Self { store, events }
            }
        }
    };
}

command_handler!(
    /// Handles [`CreateItemCommand`].
    CreateItemCommandHandler
);
command_handler!(
    /// Handles [`RenameItemCommand`].
    RenameItemCommandHandler
);
command_handler!(
    /// Handles [`AdjustItemQuantityCommand`].
    AdjustItemQuantityCommandHandler
);
command_handler!(
    /// Handles [`ArchiveItemCommand`].
    ArchiveItemCommandHandler
);

#[async_trait]
impl<S: StateStore + 'static> Handler for CreateItemCommandHandler<S> {
    type Message = CreateItemCommand;
    const TYPE_NAME: &'static str = "CreateItemCommandHandler";

    #[tracing::instrument(skip_all, fields(item_id = %command.item_id))]
    async fn handle(&self, command: CreateItemCommand) -> HandlerResult {
        let mut item = load(&self.store, command.item_id, &self.events).await?;
        item.create(&command.name, command.owner_id, command.quantity)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl<S: StateStore + 'static> Handler for RenameItemCommandHandler<S> {
    type Message = RenameItemCommand;
    const TYPE_NAME: &'static str = "RenameItemCommandHandler";

    #[tracing::instrument(skip_all, fields(item_id = %command.item_id))]
    async fn handle(&self, command: RenameItemCommand) -> HandlerResult {
        let mut item = load(&self.store, command.item_id, &self.events).await?;
        item.rename(&command.name).await?;
        Ok(())
    }
}

#[async_trait]
impl<S: StateStore + 'static> Handler for AdjustItemQuantityCommandHandler<S> {
    type Message = AdjustItemQuantityCommand;
    const TYPE_NAME: &'static str = "AdjustItemQuantityCommandHandler";

    #[tracing::instrument(skip_all, fields(item_id = %command.item_id, delta = command.delta))]
    async fn handle(&self, command: AdjustItemQuantityCommand) -> HandlerResult {
        let mut item = load(&self.store, command.item_id, &self.events).await?;
        item.adjust_quantity(command.delta).await?;
        Ok(())
    }
}

#[async_trait]
impl<S: StateStore + 'static> Handler for ArchiveItemCommandHandler<S> {
    type Message = ArchiveItemCommand;
    const TYPE_NAME: &'static str = "ArchiveItemCommandHandler";

    #[tracing::instrument(skip_all, fields(item_id = %command.item_id))]
    async fn handle(&self, command: ArchiveItemCommand) -> HandlerResult {
        let mut item = load(&self.store, command.item_id, &self.events).await?;
        item.archive().await?;
        Ok(())
    }
}

/// Writes newly created items into the `item` slice.
pub struct ItemCreatedEventHandler<S> {
    store: S,
}

impl<S: StateStore> ItemCreatedEventHandler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: StateStore + 'static> Handler for ItemCreatedEventHandler<S> {
    type Message = ItemCreatedEvent;
    const TYPE_NAME: &'static str = "ItemCreatedEventHandler";

    async fn handle(&self, event: ItemCreatedEvent) -> HandlerResult {
        let patch = ItemRecord {
            name: Some(event.name),
            owner_id: event.owner_id,
            quantity: Some(event.quantity),
            archived: Some(false),
            created_at: Some(event.created_at),
            updated_at: Some(event.created_at),
            ..ItemRecord::patch(event.item_id)
        };
        upsert(&self.store, patch).await
    }
}

/// Applies item changes to the `item` slice.
pub struct ItemUpdatedEventHandler<S> {
    store: S,
}

impl<S: StateStore> ItemUpdatedEventHandler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: StateStore + 'static> Handler for ItemUpdatedEventHandler<S> {
    type Message = ItemUpdatedEvent;
    const TYPE_NAME: &'static str = "ItemUpdatedEventHandler";

    async fn handle(&self, event: ItemUpdatedEvent) -> HandlerResult {
        let patch = ItemRecord {
            name: event.name,
            quantity: event.quantity,
            updated_at: Some(event.updated_at),
            ..ItemRecord::patch(event.item_id)
        };
        upsert(&self.store, patch).await
    }
}

/// Marks items archived in the `item` slice.
pub struct ItemArchivedEventHandler<S> {
    store: S,
}

impl<S: StateStore> ItemArchivedEventHandler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: StateStore + 'static> Handler for ItemArchivedEventHandler<S> {
    type Message = ItemArchivedEvent;
    const TYPE_NAME: &'static str = "ItemArchivedEventHandler";

    async fn handle(&self, event: ItemArchivedEvent) -> HandlerResult {
        let patch = ItemRecord {
            archived: Some(true),
            updated_at: Some(event.archived_at),
            ..ItemRecord::patch(event.item_id)
        };
        upsert(&self.store, patch).await
    }
}
