//! Record merging: create-vs-update reconciliation of incoming card records

use verascope_domain::{Card, CardId, Crop, CropError, EntityKind, Side};

use crate::catalog::Catalog;
use crate::error::CatalogError;

/// A normalized incoming card record with a parsed identity.
#[derive(Debug, Clone)]
pub struct CardRecord {
    pub id: CardId,
    pub titles: Vec<String>,
    pub authors: Vec<String>,
    pub subjects: Vec<String>,
    pub dates: Vec<String>,
    pub front_image_id: Option<String>,
    pub back_image_id: Option<String>,
}

/// How a record landed in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Created,
    Updated,
}

/// Raw crop fields as supplied by an external record, not yet validated.
#[derive(Debug, Clone)]
pub struct CropFields {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub score: f32,
    pub side: String,
}

/// Apply an incoming record onto the catalog.
///
/// Creates a new card when the identity is unknown, otherwise updates the
/// existing one. The relationship merge policy is additive union: existing
/// entries are retained, new distinct entries are appended, nothing is ever
/// removed. Applying the same record again is a no-op beyond the outcome
/// changing to `Updated`.
pub fn merge_record(catalog: &mut Catalog, record: &CardRecord) -> Result<MergeOutcome, CatalogError> {
    if !record.titles.iter().any(|t| !t.trim().is_empty()) {
        return Err(CatalogError::IncompleteRecord("at least one title is required"));
    }

    let Catalog { cards, arena, .. } = catalog;
    let outcome = if cards.contains_key(&record.id) {
        MergeOutcome::Updated
    } else {
        MergeOutcome::Created
    };
    let card = cards.entry(record.id).or_insert_with(|| Card::new(record.id));

    for (kind, values) in [
        (EntityKind::Title, &record.titles),
        (EntityKind::Author, &record.authors),
        (EntityKind::Subject, &record.subjects),
        (EntityKind::Date, &record.dates),
    ] {
        for raw in values {
            let text = raw.trim();
            if text.is_empty() {
                continue;
            }
            let entity = arena.resolve_or_insert(kind, text);
            if card.attach_entity(kind, entity) {
                arena.link_card(entity, card.id);
            }
        }
    }

    if card.title_pick.is_none() {
        card.title_pick = card.titles.first().copied();
    }
    if card.front_image_id.is_none() {
        card.front_image_id = record.front_image_id.clone();
    }
    if card.back_image_id.is_none() {
        card.back_image_id = record.back_image_id.clone();
    }

    Ok(outcome)
}

/// Validate the crops supplied in one operation.
///
/// Each crop's side tag and geometry are checked; when two crops are present
/// they must carry different sides. Nothing is attached here, so a failure
/// leaves the target card untouched.
pub fn validate_crops(
    left: Option<&CropFields>,
    right: Option<&CropFields>,
) -> Result<Vec<Crop>, CropError> {
    let mut crops = Vec::new();
    for fields in [left, right].into_iter().flatten() {
        let side: Side = fields.side.parse()?;
        crops.push(Crop::new(
            fields.x0,
            fields.y0,
            fields.x1,
            fields.y1,
            fields.score,
            side,
        )?);
    }
    if crops.len() == 2 && crops[0].side() == crops[1].side() {
        return Err(CropError::DuplicateSide(crops[0].side()));
    }
    Ok(crops)
}
