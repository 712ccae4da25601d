//! Wire shape of a message: `{ id, type, ...payload }`.

use common::{MessageId, Tag};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ActionError;
use crate::message::Message;

const RESERVED_FIELDS: [&str; 2] = ["type", "payload"];

/// A store-level action.
///
/// Commands and events travel as actions whose `type` is their tag and whose
/// fields sit next to it. Actions meant for reducers carry a `payload`; the
/// middleware uses that marker to tell them apart from messages that still
/// need a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Identifier of the action (the message id for commands and events).
    pub id: MessageId,

    /// Routing tag, serialized as `type`.
    #[serde(rename = "type")]
    pub tag: Tag,

    /// Reducer payload. Present only on actions bound for reducers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    /// Remaining top-level fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Action {
    /// Creates an empty action with a fresh id.
    pub fn new(tag: Tag) -> Self {
        Self {
            id: MessageId::new(),
            tag,
            payload: None,
            fields: Map::new(),
        }
    }

    /// Creates a reducer-bound action carrying `payload`.
    pub fn reducer(tag: Tag, payload: &impl Serialize) -> Result<Self, ActionError> {
        let mut action = Self::new(tag);
        action.payload = Some(serde_json::to_value(payload)?);
        Ok(action)
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Builds the wire form of a typed message.
    pub fn from_message<M: Message>(message: &M) -> Result<Self, ActionError> {
        let Value::Object(mut fields) = serde_json::to_value(message)? else {
            return Err(ActionError::NotAnObject {
                type_name: M::TYPE_NAME,
            });
        };

        if let Some(field) = RESERVED_FIELDS.iter().find(|f| fields.contains_key(**f)) {
            return Err(ActionError::ReservedField {
                type_name: M::TYPE_NAME,
                field: *field,
            });
        }
        fields.remove("id");

        Ok(Self {
            id: message.id(),
            tag: M::tag(),
            payload: None,
            fields,
        })
    }

    /// Decodes the action back into a typed message.
    ///
    /// The action's id becomes the message id; the payload is not part of
    /// the message.
    pub fn into_message<M: Message>(self) -> Result<M, ActionError> {
        let mut fields = self.fields;
        fields.insert("id".to_string(), serde_json::to_value(self.id)?);
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}
