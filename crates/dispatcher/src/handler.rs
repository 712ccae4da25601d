//! Handler contracts.

use async_trait::async_trait;

use crate::message::{Command, Event, Message};

/// Error returned by a handler. Any error type converts into it with `?`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result of handling one message.
pub type HandlerResult = Result<(), HandlerError>;

/// Handles one message type.
///
/// The handler's registration tag comes from [`Handler::TYPE_NAME`]: the
/// name is converted to upper snake case and truncated after its `COMMAND`
/// or `EVENT` segment, so `LoginUserCommandHandler` registers under
/// `LOGIN_USER_COMMAND`. A name without either segment is rejected when the
/// handler is registered.
///
/// `handle` may dispatch freely, but awaiting the [`Completion`] of a message
/// sent to its own dispatcher deadlocks that dispatcher.
///
/// [`Completion`]: crate::Completion
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// The message type this handler consumes.
    type Message: Message;

    /// Name of the concrete handler type, e.g. `"LoginUserCommandHandler"`.
    const TYPE_NAME: &'static str;

    async fn handle(&self, message: Self::Message) -> HandlerResult;
}

/// A handler whose message is a command.
pub trait CommandHandler: Handler<Message: Command> {}

impl<H> CommandHandler for H
where
    H: Handler,
    H::Message: Command,
{
}

/// A handler whose message is an event.
pub trait EventHandler: Handler<Message: Event> {}

impl<H> EventHandler for H
where
    H: Handler,
    H::Message: Event,
{
}
