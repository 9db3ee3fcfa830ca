//! The stereo card model

use serde::Serialize;
use uuid::Uuid;

use crate::crop::{Crop, Side};
use crate::entity::{EntityArena, EntityId, EntityKind};

/// Unique, stable card identifier. Immutable once assigned.
pub type CardId = Uuid;

/// Display color applied to cards that have not been assigned one.
pub const DEFAULT_CARD_COLOR: &str = "#F5E6D3";

/// Display opacity applied to cards that have not been assigned one.
pub const DEFAULT_COLOR_OPACITY: f64 = 0.15;

/// A cataloged stereoscopic card.
///
/// Metadata relationships (titles, authors, subjects, dates) are stored as
/// ids into the shared [`EntityArena`], preserving insertion order with no
/// duplicates per card. Crops are held at most one per side.
#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub id: CardId,
    pub front_image_id: Option<String>,
    pub back_image_id: Option<String>,
    pub card_color: String,
    pub color_opacity: f64,
    pub titles: Vec<EntityId>,
    pub title_pick: Option<EntityId>,
    pub authors: Vec<EntityId>,
    pub subjects: Vec<EntityId>,
    pub dates: Vec<EntityId>,
    crops: Vec<Crop>,
}

impl Card {
    pub fn new(id: CardId) -> Self {
        Self {
            id,
            front_image_id: None,
            back_image_id: None,
            card_color: DEFAULT_CARD_COLOR.to_string(),
            color_opacity: DEFAULT_COLOR_OPACITY,
            titles: Vec::new(),
            title_pick: None,
            authors: Vec::new(),
            subjects: Vec::new(),
            dates: Vec::new(),
            crops: Vec::new(),
        }
    }

    /// The crop for the given side, if any.
    pub fn crop(&self, side: Side) -> Option<&Crop> {
        self.crops.iter().find(|c| c.side() == side)
    }

    pub fn crops(&self) -> &[Crop] {
        &self.crops
    }

    /// Attach a crop, replacing any existing crop on the same side in a
    /// single step. A card never holds two crops for one side.
    pub fn set_crop(&mut self, crop: Crop) {
        self.crops.retain(|c| c.side() != crop.side());
        self.crops.push(crop);
    }

    pub fn remove_crop(&mut self, side: Side) -> Option<Crop> {
        let idx = self.crops.iter().position(|c| c.side() == side)?;
        Some(self.crops.remove(idx))
    }

    /// Entity ids for one relationship category, in attachment order.
    pub fn entity_ids(&self, kind: EntityKind) -> &[EntityId] {
        match kind {
            EntityKind::Title => &self.titles,
            EntityKind::Author => &self.authors,
            EntityKind::Subject => &self.subjects,
            EntityKind::Date => &self.dates,
        }
    }

    /// Append an entity reference unless already present. Returns whether
    /// the card changed.
    pub fn attach_entity(&mut self, kind: EntityKind, id: EntityId) -> bool {
        let list = match kind {
            EntityKind::Title => &mut self.titles,
            EntityKind::Author => &mut self.authors,
            EntityKind::Subject => &mut self.subjects,
            EntityKind::Date => &mut self.dates,
        };
        if list.contains(&id) {
            return false;
        }
        list.push(id);
        true
    }

    /// Case-insensitive text search across titles, authors, and subjects.
    pub fn matches_query(&self, query: &str, arena: &EntityArena) -> bool {
        let needle = query.to_lowercase();
        [&self.titles, &self.authors, &self.subjects]
            .into_iter()
            .flatten()
            .filter_map(|id| arena.text(*id))
            .any(|text| text.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crop(side: Side, score: f32) -> Crop {
        Crop::new(0.1, 0.1, 0.9, 0.9, score, side).unwrap()
    }

    #[test]
    fn set_crop_replaces_same_side() {
        let mut card = Card::new(CardId::new_v4());
        card.set_crop(crop(Side::Left, 0.5));
        card.set_crop(crop(Side::Right, 0.6));
        card.set_crop(crop(Side::Left, 0.9));

        assert_eq!(card.crops().len(), 2);
        assert_eq!(card.crop(Side::Left).unwrap().score(), 0.9);
        assert_eq!(card.crop(Side::Right).unwrap().score(), 0.6);
    }

    #[test]
    fn remove_crop_by_side() {
        let mut card = Card::new(CardId::new_v4());
        card.set_crop(crop(Side::Left, 0.5));
        assert!(card.remove_crop(Side::Left).is_some());
        assert!(card.remove_crop(Side::Left).is_none());
        assert!(card.crops().is_empty());
    }

    #[test]
    fn attach_entity_is_idempotent() {
        let mut card = Card::new(CardId::new_v4());
        let id = EntityId::new_v4();
        assert!(card.attach_entity(EntityKind::Title, id));
        assert!(!card.attach_entity(EntityKind::Title, id));
        assert_eq!(card.titles, vec![id]);
    }

    #[test]
    fn query_matches_entity_text() {
        let mut arena = EntityArena::new();
        let mut card = Card::new(CardId::new_v4());
        let title = arena.resolve_or_insert(EntityKind::Title, "Brooklyn Bridge");
        card.attach_entity(EntityKind::Title, title);

        assert!(card.matches_query("brooklyn", &arena));
        assert!(!card.matches_query("chicago", &arena));
    }
}
