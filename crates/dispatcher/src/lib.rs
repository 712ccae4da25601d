//! Command and event dispatching for the CQRS messaging layer.
//!
//! This crate provides:
//! - [`Message`] with its [`Command`] and [`Event`] kinds
//! - [`Handler`], [`CommandHandler`] and [`EventHandler`] contracts
//! - [`Dispatcher`]: one handler per tag, FIFO queue, one drain at a time
//! - [`Action`]: the `{ id, type, ...payload }` wire shape
//! - [`Middleware`]: routes tagged actions into the right dispatcher

pub mod action;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod message;
pub mod middleware;

pub use action::Action;
pub use common::{MessageId, Tag, TagError, TagKind};
pub use dispatcher::{CommandDispatcher, Completion, Dispatcher, DispatcherConfig, EventDispatcher};
pub use error::{ActionError, DispatchError, RegistrationError};
pub use handler::{CommandHandler, EventHandler, Handler, HandlerError, HandlerResult};
pub use message::{Command, Commands, Event, Events, Message, MessageKind};
pub use middleware::{Middleware, Route, Routed, route};
