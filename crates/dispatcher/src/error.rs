//! Dispatcher error types.

use common::{Tag, TagError, TagKind};
use thiserror::Error;

use crate::handler::HandlerError;

/// Errors raised when registering a handler. These are configuration defects.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The handler's name could not be turned into a tag.
    #[error("Invalid handler name: {0}")]
    Tag(#[from] TagError),

    /// The handler's derived tag differs from the tag of the message it declares.
    #[error("Handler {handler} derives tag {handler_tag} but handles {message_tag}")]
    TagMismatch {
        handler: &'static str,
        handler_tag: Tag,
        message_tag: Tag,
    },

    /// The handler's tag belongs to the other kind of dispatcher.
    #[error("Handler {handler} derives tag {tag}, which is not a {expected} tag")]
    WrongKind {
        handler: &'static str,
        tag: Tag,
        expected: TagKind,
    },
}

/// Outcome of a dispatched message that was not handled successfully.
///
/// Every variant is contained at the dispatcher: the drain loop reports it
/// and moves on to the next queued message.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No handler is registered for the tag. The message was dropped.
    #[error("No handler registered for {tag}")]
    Unhandled { tag: Tag },

    /// The handler returned an error.
    #[error("Handler for {tag} failed: {source}")]
    HandlerFailed {
        tag: Tag,
        #[source]
        source: HandlerError,
    },

    /// The handler panicked.
    #[error("Handler for {tag} panicked: {message}")]
    HandlerPanicked { tag: Tag, message: String },

    /// A wire action could not be decoded into the handler's message type.
    #[error("Could not decode {tag} action: {source}")]
    Decode {
        tag: Tag,
        #[source]
        source: ActionError,
    },

    /// The queued message is not the type the registered handler expects.
    #[error("Handler for {tag} expects {expected}")]
    TypeMismatch { tag: Tag, expected: &'static str },

    /// The drain task went away before the message was processed.
    #[error("Dispatcher dropped {tag} before processing it")]
    Abandoned { tag: Tag },

    /// No drain was running and there was no Tokio runtime to start one on.
    /// The message was not queued.
    #[error("No Tokio runtime to drain {tag} on")]
    NoRuntime { tag: Tag },
}

impl DispatchError {
    /// The tag of the message this outcome belongs to.
    pub fn tag(&self) -> &Tag {
        match self {
            DispatchError::Unhandled { tag }
            | DispatchError::HandlerFailed { tag, .. }
            | DispatchError::HandlerPanicked { tag, .. }
            | DispatchError::Decode { tag, .. }
            | DispatchError::TypeMismatch { tag, .. }
            | DispatchError::Abandoned { tag }
            | DispatchError::NoRuntime { tag } => tag,
        }
    }

    /// Returns true if the message had no registered handler.
    pub fn is_unhandled(&self) -> bool {
        matches!(self, DispatchError::Unhandled { .. })
    }
}

/// Errors converting between typed messages and wire actions.
#[derive(Debug, Error)]
pub enum ActionError {
    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The message did not serialize to a JSON object.
    #[error("{type_name} does not serialize to a JSON object")]
    NotAnObject { type_name: &'static str },

    /// The message uses a key the wire shape reserves.
    #[error("{type_name} uses the reserved field `{field}`")]
    ReservedField {
        type_name: &'static str,
        field: &'static str,
    },
}
