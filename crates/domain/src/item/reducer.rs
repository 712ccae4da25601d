//! Keeps the `item` slice in step with item events.

use common::Tag;
use dispatcher::Action;
use serde::Deserialize;
use serde::de::Error as _;
use serde_json::{Map, Value};
use state_store::Reducer;

use super::ItemRecord;

/// Reducer owning the `item` slice.
///
/// Handles one action, `UPSERT_ITEM`, whose payload is an [`ItemRecord`]
/// patch. Set fields are merged into the stored record; a missing record is
/// created.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemReducer;

impl ItemReducer {
    pub const SLICE: &'static str = "item";
    pub const UPSERT: &'static str = "UPSERT_ITEM";

    /// Builds the reducer action applying `patch`.
    pub fn upsert(patch: &ItemRecord) -> Result<Action, dispatcher::ActionError> {
        Action::reducer(Tag::new(Self::UPSERT), patch)
    }
}

impl Reducer for ItemReducer {
    fn name(&self) -> &'static str {
        "ItemReducer"
    }

    fn slice(&self) -> &'static str {
        Self::SLICE
    }

    fn reduce(&self, state: &mut Value, action: &Action) -> serde_json::Result<bool> {
        if action.tag != Self::UPSERT {
            return Ok(false);
        }
        let Some(payload) = &action.payload else {
            return Err(serde_json::Error::missing_field("payload"));
        };

        let patch = ItemRecord::deserialize(payload)?;
        let Some(id) = patch.id else {
            return Err(serde_json::Error::missing_field("id"));
        };
        let Value::Object(fields) = serde_json::to_value(&patch)? else {
            return Err(serde_json::Error::custom("item patch is not an object"));
        };

        if !state.is_object() {
            *state = Value::Object(Map::new());
        }
        let Some(items) = state.as_object_mut() else {
            return Ok(false);
        };

        let record = items
            .entry(id.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !record.is_object() {
            *record = Value::Object(Map::new());
        }
        let Some(record) = record.as_object_mut() else {
            return Ok(false);
        };

        let mut changed = false;
        for (key, value) in fields {
            if record.get(&key) != Some(&value) {
                record.insert(key, value);
                changed = true;
            }
        }
        Ok(changed)
    }
}
