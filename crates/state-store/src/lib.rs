//! Read-side state for the CQRS messaging layer.
//!
//! - [`StateStore`]: `get_state()` plus `dispatch(action)` through the middleware
//! - [`InMemoryStateStore`]: slices of JSON state updated by [`Reducer`]s
//! - [`hydrate`]: rebuilds an aggregate from a [`StateSnapshot`]

pub mod error;
pub mod hydrate;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use common::EntityId;
pub use error::{HydrationError, Result, StoreError};
pub use hydrate::{Hydrate, hydrate, hydrate_from_store};
pub use memory::InMemoryStateStore;
pub use snapshot::StateSnapshot;
pub use store::{Dispatched, Reducer, StateStore};
