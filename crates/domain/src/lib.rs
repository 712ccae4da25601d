//! Item domain for the CQRS messaging layer.
//!
//! This crate provides:
//! - [`Item`]: aggregate rebuilt from the `item` slice of the state store
//! - Commands and events covering the item lifecycle
//! - Command handlers that hydrate an [`Item`] and run its business methods
//! - Event handlers and the [`ItemReducer`] that keep the `item` slice current

pub mod error;
pub mod item;
pub mod sink;

pub use error::ItemError;
pub use item::{
    AdjustItemQuantityCommand, AdjustItemQuantityCommandHandler, ArchiveItemCommand,
    ArchiveItemCommandHandler, CreateItemCommand, CreateItemCommandHandler, Item,
    ItemArchivedEvent, ItemArchivedEventHandler, ItemCreatedEvent, ItemCreatedEventHandler,
    ItemRecord, ItemReducer, ItemUpdatedEvent, ItemUpdatedEventHandler, OwnerId,
    RenameItemCommand, RenameItemCommandHandler, register_handlers,
};
pub use sink::EventSink;
