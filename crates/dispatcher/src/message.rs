//! Message base types.

use common::{MessageId, Tag, TagKind, message_tag};
use serde::{Serialize, de::DeserializeOwned};

/// Marker for a family of messages (commands or events).
///
/// A [`Dispatcher`](crate::Dispatcher) is parameterized by one kind and only
/// accepts messages and handlers of that kind.
pub trait MessageKind: Send + Sync + 'static {
    const KIND: TagKind;
}

/// Kind marker for commands.
#[derive(Debug)]
pub enum Commands {}

/// Kind marker for events.
#[derive(Debug)]
pub enum Events {}

impl MessageKind for Commands {
    const KIND: TagKind = TagKind::Command;
}

impl MessageKind for Events {
    const KIND: TagKind = TagKind::Event;
}

/// A message that can be routed by its tag.
///
/// The tag is a pure function of [`Message::TYPE_NAME`], which is declared
/// next to the type (see [`command!`](crate::command) and
/// [`event!`](crate::event)), so every instance of a type shares one tag.
pub trait Message: Serialize + DeserializeOwned + Send + 'static {
    /// Whether this is a command or an event.
    type Kind: MessageKind;

    /// Name of the concrete type, e.g. `"LoginUserCommand"`.
    const TYPE_NAME: &'static str;

    /// Identifier assigned when the message was built.
    fn id(&self) -> MessageId;

    /// Routing tag shared by all instances of this type.
    fn tag() -> Tag
    where
        Self: Sized,
    {
        message_tag(Self::TYPE_NAME)
    }
}

/// A request to change state, handled by exactly one command handler.
pub trait Command: Message<Kind = Commands> {}

impl<M: Message<Kind = Commands>> Command for M {}

/// A fact that already happened, consumed by exactly one event handler.
pub trait Event: Message<Kind = Events> {}

impl<M: Message<Kind = Events>> Event for M {}

/// Declares a struct with an `id: MessageId` field as a command.
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// pub struct LoginUserCommand { pub id: MessageId, pub user: String }
/// dispatcher::command!(LoginUserCommand);
/// assert_eq!(LoginUserCommand::tag(), "LOGIN_USER_COMMAND");
/// ```
#[macro_export]
macro_rules! command {
    ($ty:ident) => {
        $crate::__impl_message!($ty, $crate::Commands);
    };
}

/// Declares a struct with an `id: MessageId` field as an event.
#[macro_export]
macro_rules! event {
    ($ty:ident) => {
        $crate::__impl_message!($ty, $crate::Events);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __impl_message {
    ($ty:ident, $kind:ty) => {
        impl $crate::Message for $ty {
            type Kind = $kind;

            const TYPE_NAME: &'static str = stringify!($ty);

            fn id(&self) -> $crate::MessageId {
                self.id
            }
        }
    };
}
