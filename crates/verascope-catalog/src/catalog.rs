//! In-memory catalog state and identity resolution

use std::collections::HashMap;

use uuid::Uuid;
use verascope_domain::{Card, CardId, Collection, CollectionId, EntityArena};

use crate::error::CatalogError;

/// The complete in-memory catalog: cards, shared named entities, collections.
///
/// Plain data. All mutation goes through the coordinator task; see
/// [`crate::coordinator`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub cards: HashMap<CardId, Card>,
    pub arena: EntityArena,
    pub collections: HashMap<CollectionId, Collection>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an external identifier string into a card identity.
    pub fn parse_card_id(raw: &str) -> Result<CardId, CatalogError> {
        Uuid::parse_str(raw.trim()).map_err(|_| CatalogError::MalformedIdentifier(raw.to_string()))
    }

    /// Look up at most one card with this identity. Pure query.
    pub fn card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    pub fn collection(&self, id: CollectionId) -> Option<&Collection> {
        self.collections.get(&id)
    }

    /// First collection with this exact name, if any.
    pub fn collection_by_name(&self, name: &str) -> Option<CollectionId> {
        self.collections
            .values()
            .find(|c| c.name == name)
            .map(|c| c.id)
    }

    /// Member cards of a collection in explicit order.
    ///
    /// Ids in the order with no resolvable card are silently skipped, so a
    /// collection whose membership drifted (a card removed without going
    /// through the manager) still yields a usable view.
    pub fn ordered_view(&self, id: CollectionId) -> Result<Vec<&Card>, CatalogError> {
        let collection = self
            .collections
            .get(&id)
            .ok_or(CatalogError::CollectionNotFound(id))?;
        Ok(collection
            .members
            .ids()
            .iter()
            .filter_map(|card_id| self.cards.get(card_id))
            .collect())
    }

    /// Remove a collection, detaching member cards. The cards survive.
    pub fn delete_collection(&mut self, id: CollectionId) -> Result<Collection, CatalogError> {
        self.collections
            .remove(&id)
            .ok_or(CatalogError::CollectionNotFound(id))
    }

    /// Cards matching a free-text query across titles, authors, subjects.
    pub fn search(&self, query: &str) -> Vec<&Card> {
        self.cards
            .values()
            .filter(|card| card.matches_query(query, &self.arena))
            .collect()
    }
}
