//! Stored shape of an item in the `item` slice.

use chrono::{DateTime, Utc};
use common::EntityId;
use serde::{Deserialize, Serialize};

use super::OwnerId;

/// One item record, keyed by the item id inside the `item` slice.
///
/// Every field is optional: records are built up by partial upserts, and
/// hydration tolerates whatever subset is present. Unset fields are left out
/// when serialized so a record doubles as an upsert patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<EntityId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<OwnerId>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ItemRecord {
    /// Creates an empty patch for the given item.
    pub fn patch(id: EntityId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }
}
