//! Item aggregate implementation.

use chrono::{DateTime, Utc};
use common::EntityId;
use dispatcher::Event;
use state_store::Hydrate;

use crate::{EventSink, ItemError};

use super::{ItemArchivedEvent, ItemCreatedEvent, ItemRecord, ItemUpdatedEvent, OwnerId};

/// Item aggregate root.
///
/// Rebuilt from the `item` slice for every command. Business methods check
/// the rules, emit an event and wait for it to be handled, then update the
/// in-memory copy so further calls on the same instance see the change.
#[derive(Debug)]
pub struct Item {
    id: EntityId,
    name: String,
    owner_id: Option<OwnerId>,
    quantity: u32,
    archived: bool,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    events: EventSink,
}

impl Hydrate for Item {
    type Context = EventSink;
    type Record = ItemRecord;
    const TYPE_NAME: &'static str = "Item";

    fn new(id: EntityId, events: EventSink) -> Self {
        Self {
            id,
            name: String::new(),
            owner_id: None,
            quantity: 0,
            archived: false,
            created_at: None,
            updated_at: None,
            events,
        }
    }

    fn restore(&mut self, record: ItemRecord) {
        if let Some(name) = record.name {
            self.name = name;
        }
        self.owner_id = record.owner_id;
        self.quantity = record.quantity.unwrap_or_default();
        self.archived = record.archived.unwrap_or_default();
        self.created_at = record.created_at;
        self.updated_at = record.updated_at;
    }
}

// Query methods
impl Item {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_id(&self) -> Option<OwnerId> {
        self.owner_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn is_archived(&self) -> bool {
        self.archived
    }

    /// Returns true once the item has been created.
    pub fn exists(&self) -> bool {
        self.created_at.is_some()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }
}

// Command methods (emit events)
impl Item {
    /// Creates the item.
    pub async fn create(
        &mut self,
        name: &str,
        owner_id: Option<OwnerId>,
        quantity: u32,
    ) -> Result<(), ItemError> {
        if self.exists() {
            return Err(ItemError::AlreadyExists { id: self.id });
        }
        let name = validate_name(name)?;

        let event = ItemCreatedEvent::new(self.id, name.clone(), owner_id, quantity);
        let created_at = event.created_at;
        self.emit(event).await?;

        self.name = name;
        self.owner_id = owner_id;
        self.quantity = quantity;
        self.created_at = Some(created_at);
        self.updated_at = Some(created_at);
        tracing::info!(item_id = %self.id, name = %self.name, "item created");
        Ok(())
    }

    /// Renames the item. Renaming to the current name emits nothing.
    pub async fn rename(&mut self, name: &str) -> Result<(), ItemError> {
        self.ensure_active()?;
        let name = validate_name(name)?;
        if name == self.name {
            return Ok(());
        }

        let event = ItemUpdatedEvent::renamed(self.id, name.clone());
        let updated_at = event.updated_at;
        self.emit(event).await?;

        tracing::info!(item_id = %self.id, from = %self.name, to = %name, "item renamed");
        self.name = name;
        self.updated_at = Some(updated_at);
        Ok(())
    }

    /// Adds `delta` to the quantity on hand. A zero delta emits nothing.
    pub async fn adjust_quantity(&mut self, delta: i64) -> Result<(), ItemError> {
        self.ensure_active()?;
        if delta == 0 {
            return Ok(());
        }

        let target = i64::from(self.quantity) + delta;
        if target < 0 {
            return Err(ItemError::InsufficientQuantity {
                id: self.id,
                available: self.quantity,
                delta,
            });
        }
        let quantity =
            u32::try_from(target).map_err(|_| ItemError::QuantityOverflow { id: self.id })?;

        let event = ItemUpdatedEvent::quantity_changed(self.id, quantity);
        let updated_at = event.updated_at;
        self.emit(event).await?;

        tracing::info!(item_id = %self.id, quantity, "item quantity adjusted");
        self.quantity = quantity;
        self.updated_at = Some(updated_at);
        Ok(())
    }

    /// Archives the item. Archiving twice emits nothing the second time.
    pub async fn archive(&mut self) -> Result<(), ItemError> {
        if !self.exists() {
            return Err(ItemError::NotFound { id: self.id });
        }
        if self.archived {
            return Ok(());
        }

        let event = ItemArchivedEvent::new(self.id);
        let archived_at = event.archived_at;
        self.emit(event).await?;

        tracing::info!(item_id = %self.id, "item archived");
        self.archived = true;
        self.updated_at = Some(archived_at);
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), ItemError> {
        if !self.exists() {
            return Err(ItemError::NotFound { id: self.id });
        }
        if self.archived {
            return Err(ItemError::Archived { id: self.id });
        }
        Ok(())
    }

    async fn emit<E: Event>(&self, event: E) -> Result<(), ItemError> {
        self.events
            .emit(event)
            .await
            .map_err(ItemError::EventRejected)
    }
}

fn validate_name(name: &str) -> Result<String, ItemError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ItemError::BlankName);
    }
    Ok(name.to_string())
}
