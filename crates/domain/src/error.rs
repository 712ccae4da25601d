//! Domain error types.

use common::EntityId;
use dispatcher::DispatchError;
use thiserror::Error;

/// Business rule violations raised by the [`Item`](crate::Item) aggregate.
#[derive(Debug, Error)]
pub enum ItemError {
    /// Item names must contain something other than whitespace.
    #[error("Item name must not be blank")]
    BlankName,

    /// The item was already created.
    #[error("Item already exists: {id}")]
    AlreadyExists { id: EntityId },

    /// No item with this id has been created.
    #[error("Item not found: {id}")]
    NotFound { id: EntityId },

    /// Archived items cannot be changed.
    #[error("Item is archived: {id}")]
    Archived { id: EntityId },

    /// The adjustment would take the quantity below zero.
    #[error("Insufficient quantity for item {id}: have {available}, adjustment {delta}")]
    InsufficientQuantity {
        id: EntityId,
        available: u32,
        delta: i64,
    },

    /// The adjustment would overflow the quantity.
    #[error("Quantity overflow for item {id}")]
    QuantityOverflow { id: EntityId },

    /// An emitted event was not handled successfully.
    #[error("Event was rejected: {0}")]
    EventRejected(#[source] DispatchError),
}
