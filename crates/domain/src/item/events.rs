//! Item domain events.

use chrono::{DateTime, Utc};
use common::{EntityId, MessageId};
use serde::{Deserialize, Serialize};

use super::OwnerId;

/// An item was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCreatedEvent {
    pub id: MessageId,
    pub item_id: EntityId,
    pub name: String,
    pub owner_id: Option<OwnerId>,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

impl ItemCreatedEvent {
    pub fn new(item_id: EntityId, name: String, owner_id: Option<OwnerId>, quantity: u32) -> Self {
        Self {
            id: MessageId::new(),
            item_id,
            name,
            owner_id,
            quantity,
            created_at: Utc::now(),
        }
    }
}

dispatcher::event!(ItemCreatedEvent);

/// Some fields of an item changed. Unchanged fields are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdatedEvent {
    pub id: MessageId,
    pub item_id: EntityId,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub quantity: Option<u32>,

    pub updated_at: DateTime<Utc>,
}

impl ItemUpdatedEvent {
    /// The item was renamed.
    pub fn renamed(item_id: EntityId, name: String) -> Self {
        Self {
            id: MessageId::new(),
            item_id,
            name: Some(name),
            quantity: None,
            updated_at: Utc::now(),
        }
    }

    /// The item's quantity changed.
    pub fn quantity_changed(item_id: EntityId, quantity: u32) -> Self {
        Self {
            id: MessageId::new(),
            item_id,
            name: None,
            quantity: Some(quantity),
            updated_at: Utc::now(),
        }
    }
}

dispatcher::event!(ItemUpdatedEvent);

/// An item was archived.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemArchivedEvent {
    pub id: MessageId,
    pub item_id: EntityId,
    pub archived_at: DateTime<Utc>,
}

impl ItemArchivedEvent {
    pub fn new(item_id: EntityId) -> Self {
        Self {
            id: MessageId::new(),
            item_id,
            archived_at: Utc::now(),
        }
    }
}

dispatcher::event!(ItemArchivedEvent);
