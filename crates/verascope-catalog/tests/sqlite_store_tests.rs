//! SQLite store round-trips: what is committed is exactly what reloads.

use verascope_catalog::{CatalogStore, SqliteCatalogStore};
use verascope_domain::{
    Card, CardId, Collection, Crop, EntityKind, NamedEntity, Side,
};

fn sample_card(arena_entities: &mut Vec<NamedEntity>) -> Card {
    let mut card = Card::new(CardId::new_v4());
    let title = NamedEntity::new(EntityKind::Title, "Golden Gate, San Francisco");
    let author = NamedEntity::new(EntityKind::Author, "Underwood & Underwood");
    let subject = NamedEntity::new(EntityKind::Subject, "Harbors");
    card.attach_entity(EntityKind::Title, title.id);
    card.attach_entity(EntityKind::Author, author.id);
    card.attach_entity(EntityKind::Subject, subject.id);
    card.title_pick = Some(title.id);
    card.front_image_id = Some("front-7".to_string());
    card.set_crop(Crop::new(0.02, 0.05, 0.49, 0.97, 0.91, Side::Left).unwrap());
    card.set_crop(Crop::new(0.51, 0.05, 0.98, 0.97, 0.88, Side::Right).unwrap());
    arena_entities.extend([title, author, subject]);
    card
}

#[test]
fn committed_card_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");

    let mut entities = Vec::new();
    let card = sample_card(&mut entities);
    let card_id = card.id;

    {
        let mut store = SqliteCatalogStore::open(&path).unwrap();
        for entity in &entities {
            store.save_entity(entity).unwrap();
        }
        store.save_card(&card).unwrap();
        store.commit().unwrap();
    }

    let mut store = SqliteCatalogStore::open(&path).unwrap();
    let catalog = store.load().unwrap();
    let loaded = catalog.cards.get(&card_id).unwrap();

    assert_eq!(loaded.front_image_id.as_deref(), Some("front-7"));
    assert_eq!(loaded.title_pick, card.title_pick);
    assert_eq!(loaded.titles, card.titles);
    assert_eq!(loaded.authors, card.authors);
    assert_eq!(loaded.subjects, card.subjects);
    assert!(loaded.crop(Side::Left).is_some());
    assert!(loaded.crop(Side::Right).is_some());
    assert_eq!(
        catalog.arena.lookup(EntityKind::Subject, "Harbors"),
        Some(card.subjects[0])
    );
}

#[test]
fn uncommitted_writes_do_not_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");

    {
        let mut store = SqliteCatalogStore::open(&path).unwrap();
        store.save_card(&Card::new(CardId::new_v4())).unwrap();
        // dropped without commit
    }

    let mut store = SqliteCatalogStore::open(&path).unwrap();
    assert!(store.load().unwrap().cards.is_empty());
}

#[test]
fn collection_order_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");

    let a = Card::new(CardId::new_v4());
    let b = Card::new(CardId::new_v4());
    let mut collection = Collection::new("westward");
    collection.add_card(b.id);
    collection.add_card(a.id);
    let cid = collection.id;

    {
        let mut store = SqliteCatalogStore::open(&path).unwrap();
        store.save_card(&a).unwrap();
        store.save_card(&b).unwrap();
        store.save_collection(&collection).unwrap();
        store.commit().unwrap();
    }

    let mut store = SqliteCatalogStore::open(&path).unwrap();
    let catalog = store.load().unwrap();
    let loaded = catalog.collections.get(&cid).unwrap();
    assert_eq!(loaded.name, "westward");
    assert_eq!(loaded.members.ids(), &[b.id, a.id]);
}

#[test]
fn orphaned_membership_rows_load_back() {
    // membership rows deliberately have no card foreign key; a missing
    // card must not poison the load
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");

    let ghost = CardId::new_v4();
    let mut collection = Collection::new("drifted");
    collection.add_card(ghost);
    let cid = collection.id;

    {
        let mut store = SqliteCatalogStore::open(&path).unwrap();
        store.save_collection(&collection).unwrap();
        store.commit().unwrap();
    }

    let mut store = SqliteCatalogStore::open(&path).unwrap();
    let catalog = store.load().unwrap();
    assert_eq!(catalog.collections.get(&cid).unwrap().members.ids(), &[ghost]);
    assert!(catalog.ordered_view(cid).unwrap().is_empty());
}

#[test]
fn delete_card_removes_crops_too() {
    let mut store = SqliteCatalogStore::open_in_memory().unwrap();

    let mut entities = Vec::new();
    let card = sample_card(&mut entities);
    let card_id = card.id;
    for entity in &entities {
        store.save_entity(entity).unwrap();
    }
    store.save_card(&card).unwrap();
    store.commit().unwrap();

    store.delete_card(card_id).unwrap();
    store.commit().unwrap();
    assert!(!store.load().unwrap().cards.contains_key(&card_id));
}

#[test]
fn delete_collection_keeps_cards() {
    let mut store = SqliteCatalogStore::open_in_memory().unwrap();

    let card = Card::new(CardId::new_v4());
    let mut collection = Collection::new("doomed");
    collection.add_card(card.id);
    let cid = collection.id;

    store.save_card(&card).unwrap();
    store.save_collection(&collection).unwrap();
    store.commit().unwrap();

    store.delete_collection(cid).unwrap();
    store.commit().unwrap();

    let catalog = store.load().unwrap();
    assert!(catalog.collections.is_empty());
    assert!(catalog.cards.contains_key(&card.id));
}

#[test]
fn save_card_is_idempotent_per_commit() {
    let mut store = SqliteCatalogStore::open_in_memory().unwrap();

    let mut entities = Vec::new();
    let mut card = sample_card(&mut entities);
    for entity in &entities {
        store.save_entity(entity).unwrap();
    }
    store.save_card(&card).unwrap();

    // second save in the same transaction replaces, not duplicates
    card.back_image_id = Some("back-7".to_string());
    store.save_card(&card).unwrap();
    store.commit().unwrap();

    let catalog = store.load().unwrap();
    let loaded = catalog.cards.get(&card.id).unwrap();
    assert_eq!(loaded.back_image_id.as_deref(), Some("back-7"));
    assert_eq!(loaded.titles.len(), 1);
    assert_eq!(loaded.crops().len(), 2);
}
