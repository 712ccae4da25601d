use common::EntityId;
use dispatcher::ActionError;
use thiserror::Error;

/// Errors that can occur when dispatching to the state store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A reducer could not read the action's payload.
    #[error("Reducer {reducer} failed: {source}")]
    Reducer {
        reducer: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// An action could not be built or decoded.
    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    /// The store already has a middleware installed.
    #[error("Middleware is already installed")]
    MiddlewareInstalled,
}

/// Errors that can occur while hydrating an aggregate.
///
/// A missing record is not one of them: it yields a blank aggregate.
#[derive(Debug, Error)]
pub enum HydrationError {
    /// A record exists but does not match the aggregate's schema.
    #[error("Malformed {slice} record for {id}: {source}")]
    MalformedRecord {
        slice: String,
        id: EntityId,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for state store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
