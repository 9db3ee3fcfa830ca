//! Shared named entities (titles, authors, subjects, dates) and their arena

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::card::CardId;

/// Unique named-entity identifier.
pub type EntityId = Uuid;

/// The relationship category a named entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Title,
    Author,
    Subject,
    Date,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Title,
        EntityKind::Author,
        EntityKind::Subject,
        EntityKind::Date,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Title => "title",
            EntityKind::Author => "author",
            EntityKind::Subject => "subject",
            EntityKind::Date => "date",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<EntityKind> {
        match s {
            "title" => Some(EntityKind::Title),
            "author" => Some(EntityKind::Author),
            "subject" => Some(EntityKind::Subject),
            "date" => Some(EntityKind::Date),
            _ => None,
        }
    }
}

/// A shared text value referenced by many cards.
///
/// Text is immutable once created; the back-reference set tracks which cards
/// currently use the entity.
#[derive(Debug, Clone, Serialize)]
pub struct NamedEntity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub text: String,
    pub cards: HashSet<CardId>,
}

impl NamedEntity {
    pub fn new(kind: EntityKind, text: impl Into<String>) -> Self {
        Self {
            id: EntityId::new_v4(),
            kind,
            text: text.into(),
            cards: HashSet::new(),
        }
    }
}

/// Owns every named entity in the catalog plus the dedup-by-text index.
///
/// At most one entity exists per (kind, normalized text);
/// [`EntityArena::resolve_or_insert`] is the only allocation path, which makes
/// the reuse-existing-entity rule an explicit index operation.
#[derive(Debug, Clone, Default)]
pub struct EntityArena {
    entities: HashMap<EntityId, NamedEntity>,
    by_text: HashMap<(EntityKind, String), EntityId>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text normalization used by the dedup index.
    pub fn normalize(text: &str) -> &str {
        text.trim()
    }

    /// Id of the entity with this exact normalized text, if one exists.
    pub fn lookup(&self, kind: EntityKind, text: &str) -> Option<EntityId> {
        self.by_text
            .get(&(kind, Self::normalize(text).to_string()))
            .copied()
    }

    /// Return the existing entity for this text, or allocate a new one.
    pub fn resolve_or_insert(&mut self, kind: EntityKind, text: &str) -> EntityId {
        let normalized = Self::normalize(text).to_string();
        if let Some(id) = self.by_text.get(&(kind, normalized.clone())) {
            return *id;
        }
        let entity = NamedEntity::new(kind, normalized.clone());
        let id = entity.id;
        self.by_text.insert((kind, normalized), id);
        self.entities.insert(id, entity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&NamedEntity> {
        self.entities.get(&id)
    }

    /// Entity text by id, for display and sorting.
    pub fn text(&self, id: EntityId) -> Option<&str> {
        self.entities.get(&id).map(|e| e.text.as_str())
    }

    /// Record that `card` references the entity.
    pub fn link_card(&mut self, id: EntityId, card: CardId) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.cards.insert(card);
        }
    }

    /// Drop the back-reference from the entity to `card`.
    pub fn unlink_card(&mut self, id: EntityId, card: CardId) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.cards.remove(&card);
        }
    }

    /// Insert an entity reconstructed from storage, keeping the index
    /// consistent. An existing entity with the same text wins.
    pub fn insert_loaded(&mut self, entity: NamedEntity) {
        let key = (entity.kind, entity.text.clone());
        if self.by_text.contains_key(&key) {
            return;
        }
        self.by_text.insert(key, entity.id);
        self.entities.insert(entity.id, entity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedEntity> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_by_exact_text() {
        let mut arena = EntityArena::new();
        let a = arena.resolve_or_insert(EntityKind::Subject, "New York");
        let b = arena.resolve_or_insert(EntityKind::Subject, "New York");
        assert_eq!(a, b);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn dedup_trims_whitespace() {
        let mut arena = EntityArena::new();
        let a = arena.resolve_or_insert(EntityKind::Title, "Niagara Falls");
        let b = arena.resolve_or_insert(EntityKind::Title, "  Niagara Falls ");
        assert_eq!(a, b);
        assert_eq!(arena.text(a), Some("Niagara Falls"));
    }

    #[test]
    fn kinds_are_distinct_namespaces() {
        let mut arena = EntityArena::new();
        let title = arena.resolve_or_insert(EntityKind::Title, "1900");
        let date = arena.resolve_or_insert(EntityKind::Date, "1900");
        assert_ne!(title, date);
    }

    #[test]
    fn link_and_unlink_card() {
        let mut arena = EntityArena::new();
        let id = arena.resolve_or_insert(EntityKind::Author, "Underwood & Underwood");
        let card = CardId::new_v4();

        arena.link_card(id, card);
        assert!(arena.get(id).unwrap().cards.contains(&card));

        arena.unlink_card(id, card);
        assert!(arena.get(id).unwrap().cards.is_empty());
    }

    #[test]
    fn insert_loaded_prefers_existing_text() {
        let mut arena = EntityArena::new();
        let existing = arena.resolve_or_insert(EntityKind::Subject, "Bridges");

        arena.insert_loaded(NamedEntity::new(EntityKind::Subject, "Bridges"));
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.lookup(EntityKind::Subject, "Bridges"), Some(existing));
    }
}
