//! Item commands.

use common::{EntityId, MessageId};
use serde::{Deserialize, Serialize};

use super::OwnerId;

/// Command to create a new item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemCommand {
    pub id: MessageId,

    /// The item to create.
    pub item_id: EntityId,

    pub name: String,

    #[serde(default)]
    pub owner_id: Option<OwnerId>,

    /// Initial quantity on hand.
    #[serde(default)]
    pub quantity: u32,
}

impl CreateItemCommand {
    /// Creates the command with a generated item id.
    pub fn new(name: impl Into<String>, owner_id: Option<OwnerId>, quantity: u32) -> Self {
        Self::for_item(EntityId::new(), name, owner_id, quantity)
    }

    /// Creates the command for a known item id.
    pub fn for_item(
        item_id: EntityId,
        name: impl Into<String>,
        owner_id: Option<OwnerId>,
        quantity: u32,
    ) -> Self {
        Self {
            id: MessageId::new(),
            item_id,
            name: name.into(),
            owner_id,
            quantity,
        }
    }
}

dispatcher::command!(CreateItemCommand);

/// Command to rename an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameItemCommand {
    pub id: MessageId,
    pub item_id: EntityId,
    pub name: String,
}

impl RenameItemCommand {
    pub fn new(item_id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            item_id,
            name: name.into(),
        }
    }
}

dispatcher::command!(RenameItemCommand);

/// Command to add to or take from an item's quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustItemQuantityCommand {
    pub id: MessageId,
    pub item_id: EntityId,

    /// Signed change; negative values take stock out.
    pub delta: i64,
}

impl AdjustItemQuantityCommand {
    pub fn new(item_id: EntityId, delta: i64) -> Self {
        Self {
            id: MessageId::new(),
            item_id,
            delta,
        }
    }
}

dispatcher::command!(AdjustItemQuantityCommand);

/// Command to archive an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveItemCommand {
    pub id: MessageId,
    pub item_id: EntityId,
}

impl ArchiveItemCommand {
    pub fn new(item_id: EntityId) -> Self {
        Self {
            id: MessageId::new(),
            item_id,
        }
    }
}

dispatcher::command!(ArchiveItemCommand);
