//! Shared building blocks for the CQRS messaging layer.
//!
//! - [`MessageId`] and [`EntityId`]: UUID-backed identifiers
//! - [`Tag`]: the routing key derived from a message or handler type name

pub mod tag;
pub mod types;

pub use tag::{Tag, TagError, TagKind, handler_tag, message_tag};
pub use types::{EntityId, MessageId};
