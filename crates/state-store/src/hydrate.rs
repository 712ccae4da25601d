//! Rebuilds domain aggregates from store state.

use common::EntityId;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{HydrationError, StateSnapshot, StateStore};

/// An aggregate that can be rebuilt from its record in a state slice.
pub trait Hydrate: Sized {
    /// Capability handed to every fresh instance (typically an event sink).
    type Context;

    /// Stored shape of the aggregate. Every field should be optional or
    /// defaulted; id fields use UUID-backed types.
    type Record: DeserializeOwned;

    /// Type name of the aggregate, e.g. `"Item"`.
    const TYPE_NAME: &'static str;

    /// Name of the slice holding this aggregate's records.
    fn slice_name() -> String {
        Self::TYPE_NAME.to_lowercase()
    }

    /// Creates a blank aggregate carrying only its id and context.
    fn new(id: EntityId, context: Self::Context) -> Self;

    /// Copies stored data onto a blank aggregate.
    fn restore(&mut self, record: Self::Record);
}

/// Rebuilds aggregate `A` with the given id from a snapshot.
///
/// A missing slice or record yields the blank aggregate.
pub fn hydrate<A: Hydrate>(
    snapshot: &StateSnapshot,
    id: EntityId,
    context: A::Context,
) -> Result<A, HydrationError> {
    let slice = A::slice_name();
    let mut aggregate = A::new(id, context);

    let Some(raw) = snapshot.record(&slice, &id.to_string()) else {
        tracing::trace!(aggregate = A::TYPE_NAME, %id, "no stored record");
        return Ok(aggregate);
    };

    let record = A::Record::deserialize(raw)
        .map_err(|source| HydrationError::MalformedRecord { slice, id, source })?;
    aggregate.restore(record);

    Ok(aggregate)
}

/// Reads the current state of `store` and hydrates `A` from it.
pub async fn hydrate_from_store<A, S>(
    store: &S,
    id: EntityId,
    context: A::Context,
) -> Result<A, HydrationError>
where
    A: Hydrate,
    S: StateStore + ?Sized,
{
    let snapshot = store.get_state().await;
    hydrate(&snapshot, id, context)
}
