//! Automatic collection ordering strategies

use std::collections::HashMap;

use verascope_domain::{Card, CardId, Collection, EntityId};

use crate::catalog::Catalog;

/// How to derive a new order for a collection's cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortStrategy {
    /// Earliest date text, then subject coherence with the rest of the
    /// collection, then picked-title text.
    DateThenCoherence,
    /// Picked-title text only.
    Title,
}

/// Compute a sorted permutation of the collection's current order.
///
/// The result always contains exactly the ids already in the order: ids with
/// no resolvable card keep their relative position at the end, so the result
/// is a valid input for an atomic reorder even when membership has drifted.
pub fn sorted_order(
    catalog: &Catalog,
    collection: &Collection,
    strategy: SortStrategy,
) -> Vec<CardId> {
    let mut resolvable: Vec<&Card> = Vec::new();
    let mut orphans: Vec<CardId> = Vec::new();
    for id in collection.members.ids() {
        match catalog.cards.get(id) {
            Some(card) => resolvable.push(card),
            None => orphans.push(*id),
        }
    }

    // subject id -> number of member cards carrying it
    let mut subject_counts: HashMap<EntityId, usize> = HashMap::new();
    for card in &resolvable {
        for subject in &card.subjects {
            *subject_counts.entry(*subject).or_default() += 1;
        }
    }

    resolvable.sort_by(|a, b| match strategy {
        SortStrategy::Title => title_key(a, catalog).cmp(&title_key(b, catalog)),
        SortStrategy::DateThenCoherence => date_key(a, catalog)
            .cmp(&date_key(b, catalog))
            .then_with(|| coherence(b, &subject_counts).cmp(&coherence(a, &subject_counts)))
            .then_with(|| title_key(a, catalog).cmp(&title_key(b, catalog))),
    });

    resolvable
        .into_iter()
        .map(|card| card.id)
        .chain(orphans)
        .collect()
}

fn title_key<'a>(card: &Card, catalog: &'a Catalog) -> &'a str {
    card.title_pick
        .and_then(|id| catalog.arena.text(id))
        .unwrap_or("")
}

/// Earliest date text; cards without a date sort last.
fn date_key<'a>(card: &Card, catalog: &'a Catalog) -> (bool, &'a str) {
    let date = card
        .dates
        .iter()
        .filter_map(|id| catalog.arena.text(*id))
        .min();
    (date.is_none(), date.unwrap_or(""))
}

/// How many of the card's subjects are shared with at least one other member.
fn coherence(card: &Card, subject_counts: &HashMap<EntityId, usize>) -> usize {
    card.subjects
        .iter()
        .filter(|id| subject_counts.get(id).copied().unwrap_or(0) >= 2)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use verascope_domain::EntityKind;

    fn card_with(
        catalog: &mut Catalog,
        title: &str,
        date: Option<&str>,
        subjects: &[&str],
    ) -> CardId {
        let id = CardId::new_v4();
        let mut card = Card::new(id);
        let title_id = catalog.arena.resolve_or_insert(EntityKind::Title, title);
        card.attach_entity(EntityKind::Title, title_id);
        card.title_pick = Some(title_id);
        if let Some(d) = date {
            let date_id = catalog.arena.resolve_or_insert(EntityKind::Date, d);
            card.attach_entity(EntityKind::Date, date_id);
        }
        for s in subjects {
            let sid = catalog.arena.resolve_or_insert(EntityKind::Subject, s);
            card.attach_entity(EntityKind::Subject, sid);
        }
        catalog.cards.insert(id, card);
        id
    }

    #[test]
    fn dates_sort_first_and_missing_dates_sort_last() {
        let mut catalog = Catalog::new();
        let late = card_with(&mut catalog, "B", Some("1905"), &[]);
        let early = card_with(&mut catalog, "C", Some("1899"), &[]);
        let undated = card_with(&mut catalog, "A", None, &[]);

        let mut collection = Collection::new("by date");
        for id in [late, undated, early] {
            collection.add_card(id);
        }

        let order = sorted_order(&catalog, &collection, SortStrategy::DateThenCoherence);
        assert_eq!(order, vec![early, late, undated]);
    }

    #[test]
    fn coherence_breaks_date_ties() {
        let mut catalog = Catalog::new();
        let loner = card_with(&mut catalog, "A", Some("1900"), &["Canals"]);
        let shared1 = card_with(&mut catalog, "B", Some("1900"), &["Bridges"]);
        let shared2 = card_with(&mut catalog, "C", Some("1901"), &["Bridges"]);

        let mut collection = Collection::new("tie");
        for id in [loner, shared1, shared2] {
            collection.add_card(id);
        }

        let order = sorted_order(&catalog, &collection, SortStrategy::DateThenCoherence);
        // shared1 wins the 1900 tie on subject coherence
        assert_eq!(order, vec![shared1, loner, shared2]);
    }

    #[test]
    fn title_strategy_sorts_lexically() {
        let mut catalog = Catalog::new();
        let b = card_with(&mut catalog, "Boston Harbor", None, &[]);
        let a = card_with(&mut catalog, "Albany", None, &[]);

        let mut collection = Collection::new("titles");
        collection.add_card(b);
        collection.add_card(a);

        let order = sorted_order(&catalog, &collection, SortStrategy::Title);
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn orphans_are_kept_at_the_end() {
        let mut catalog = Catalog::new();
        let real = card_with(&mut catalog, "Real", Some("1900"), &[]);
        let ghost = CardId::new_v4();

        let mut collection = Collection::new("drifted");
        collection.add_card(ghost);
        collection.add_card(real);

        let order = sorted_order(&catalog, &collection, SortStrategy::DateThenCoherence);
        assert_eq!(order, vec![real, ghost]);
        // still a permutation, safe to feed into reorder
        let mut check = collection.members.clone();
        assert!(check.reorder(order).is_ok());
    }
}
