//! Storage contracts for catalog persistence

use std::collections::HashMap;

use thiserror::Error;
use verascope_domain::{Card, CardId, Collection, CollectionId, EntityId, NamedEntity};

use crate::catalog::Catalog;

/// Errors from a catalog store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying persistence engine failure.
    #[error("persist failure: {0}")]
    Persist(String),

    /// Stored data could not be reconstructed into domain types.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),
}

/// The trait all persistence backends implement.
///
/// Writes accumulate until [`CatalogStore::commit`]; a commit is the
/// checkpoint boundary — work saved but not yet committed is lost if the
/// process terminates.
pub trait CatalogStore: Send {
    fn save_card(&mut self, card: &Card) -> Result<(), StoreError>;

    fn save_entity(&mut self, entity: &NamedEntity) -> Result<(), StoreError>;

    fn save_collection(&mut self, collection: &Collection) -> Result<(), StoreError>;

    fn delete_card(&mut self, id: CardId) -> Result<(), StoreError>;

    fn delete_collection(&mut self, id: CollectionId) -> Result<(), StoreError>;

    /// Reconstruct the full committed catalog.
    fn load(&mut self) -> Result<Catalog, StoreError>;

    /// Make all writes since the previous commit durable.
    fn commit(&mut self) -> Result<(), StoreError>;
}

/// In-memory store: staged writes become visible to [`CatalogStore::load`]
/// only after a commit. Used in tests and as the no-persistence backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    staged: Snapshot,
    committed: Snapshot,
}

#[derive(Debug, Clone, Default)]
struct Snapshot {
    cards: HashMap<CardId, Card>,
    entities: HashMap<EntityId, NamedEntity>,
    collections: HashMap<CollectionId, Collection>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cards in the last committed snapshot.
    pub fn committed_cards(&self) -> usize {
        self.committed.cards.len()
    }
}

impl CatalogStore for MemoryStore {
    fn save_card(&mut self, card: &Card) -> Result<(), StoreError> {
        self.staged.cards.insert(card.id, card.clone());
        Ok(())
    }

    fn save_entity(&mut self, entity: &NamedEntity) -> Result<(), StoreError> {
        self.staged.entities.insert(entity.id, entity.clone());
        Ok(())
    }

    fn save_collection(&mut self, collection: &Collection) -> Result<(), StoreError> {
        self.staged
            .collections
            .insert(collection.id, collection.clone());
        Ok(())
    }

    fn delete_card(&mut self, id: CardId) -> Result<(), StoreError> {
        self.staged.cards.remove(&id);
        Ok(())
    }

    fn delete_collection(&mut self, id: CollectionId) -> Result<(), StoreError> {
        self.staged.collections.remove(&id);
        Ok(())
    }

    fn load(&mut self) -> Result<Catalog, StoreError> {
        let mut catalog = Catalog::new();
        catalog.cards = self.committed.cards.clone();
        for entity in self.committed.entities.values() {
            catalog.arena.insert_loaded(entity.clone());
        }
        catalog.collections = self.committed.collections.clone();
        Ok(catalog)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.committed = self.staged.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verascope_domain::EntityKind;

    #[test]
    fn uncommitted_writes_are_invisible_to_load() {
        let mut store = MemoryStore::new();
        let id = CardId::new_v4();
        store.save_card(&Card::new(id)).unwrap();

        assert!(store.load().unwrap().cards.is_empty());
        store.commit().unwrap();
        assert!(store.load().unwrap().cards.contains_key(&id));
    }

    #[test]
    fn load_rebuilds_the_arena_index() {
        let mut store = MemoryStore::new();
        let entity = NamedEntity::new(EntityKind::Subject, "Bridges");
        let eid = entity.id;
        store.save_entity(&entity).unwrap();
        store.commit().unwrap();

        let catalog = store.load().unwrap();
        assert_eq!(catalog.arena.lookup(EntityKind::Subject, "Bridges"), Some(eid));
    }
}
