//! Item aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod handlers;
mod record;
mod reducer;
mod value_objects;

pub use aggregate::Item;
pub use commands::{
    AdjustItemQuantityCommand, ArchiveItemCommand, CreateItemCommand, RenameItemCommand,
};
pub use events::{ItemArchivedEvent, ItemCreatedEvent, ItemUpdatedEvent};
pub use handlers::{
    AdjustItemQuantityCommandHandler, ArchiveItemCommandHandler, CreateItemCommandHandler,
    ItemArchivedEventHandler, ItemCreatedEventHandler, ItemUpdatedEventHandler,
    RenameItemCommandHandler,
};
pub use record::ItemRecord;
pub use reducer::ItemReducer;
pub use value_objects::OwnerId;

use dispatcher::{CommandDispatcher, EventDispatcher, RegistrationError};
use state_store::StateStore;

use crate::EventSink;

/// Registers every item command and event handler.
///
/// Command handlers hydrate from `store` and emit into `events`; event
/// handlers write reducer actions back to `store`.
pub fn register_handlers<S>(
    commands: &CommandDispatcher,
    events: &EventDispatcher,
    store: &S,
) -> Result<(), RegistrationError>
where
    S: StateStore + Clone + 'static,
{
    let sink = EventSink::new(events.clone());

    commands.register_handler(CreateItemCommandHandler::new(store.clone(), sink.clone()))?;
    commands.register_handler(RenameItemCommandHandler::new(store.clone(), sink.clone()))?;
    commands.register_handler(AdjustItemQuantityCommandHandler::new(
        store.clone(),
        sink.clone(),
    ))?;
    commands.register_handler(ArchiveItemCommandHandler::new(store.clone(), sink))?;

    events.register_handler(ItemCreatedEventHandler::new(store.clone()))?;
    events.register_handler(ItemUpdatedEventHandler::new(store.clone()))?;
    events.register_handler(ItemArchivedEventHandler::new(store.clone()))?;

    tracing::info!("item handlers registered");
    Ok(())
}
