//! SQLite-backed implementation of the catalog store

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;
use verascope_domain::{
    Card, CardId, Collection, CollectionId, Crop, EntityKind, NamedEntity, Side,
};

use crate::catalog::Catalog;
use crate::store::{CatalogStore, StoreError};

/// SQLite persistence for the catalog.
///
/// Writes run inside an explicit transaction opened lazily on the first save
/// after a commit, so [`CatalogStore::commit`] is the checkpoint boundary.
pub struct SqliteCatalogStore {
    conn: Connection,
    in_tx: bool,
}

impl SqliteCatalogStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(persist)?;
        Self::init(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(persist)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS cards (
                id TEXT PRIMARY KEY,
                front_image_id TEXT,
                back_image_id TEXT,
                card_color TEXT NOT NULL,
                color_opacity REAL NOT NULL,
                title_pick TEXT
            );

            CREATE TABLE IF NOT EXISTS crops (
                card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
                side TEXT NOT NULL,
                x0 REAL NOT NULL,
                y0 REAL NOT NULL,
                x1 REAL NOT NULL,
                y1 REAL NOT NULL,
                score REAL NOT NULL,
                PRIMARY KEY (card_id, side)
            );

            CREATE TABLE IF NOT EXISTS entities (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                text TEXT NOT NULL,
                UNIQUE (kind, text)
            );

            CREATE TABLE IF NOT EXISTS card_entities (
                card_id TEXT NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
                entity_id TEXT NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
                kind TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (card_id, entity_id, kind)
            );

            CREATE TABLE IF NOT EXISTS collections (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- card_id carries no foreign key: an order may reference cards
            -- that drifted out of the catalog, and reads tolerate that
            CREATE TABLE IF NOT EXISTS collection_cards (
                collection_id TEXT NOT NULL
                    REFERENCES collections(id) ON DELETE CASCADE,
                card_id TEXT NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (collection_id, card_id)
            );
            ",
        )
        .map_err(persist)?;

        Ok(Self { conn, in_tx: false })
    }

    fn begin_if_needed(&mut self) -> Result<(), StoreError> {
        if !self.in_tx {
            self.conn.execute_batch("BEGIN IMMEDIATE").map_err(persist)?;
            self.in_tx = true;
        }
        Ok(())
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn save_card(&mut self, card: &Card) -> Result<(), StoreError> {
        self.begin_if_needed()?;

        self.conn
            .execute(
                "INSERT OR REPLACE INTO cards
                 (id, front_image_id, back_image_id, card_color, color_opacity, title_pick)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    card.id.to_string(),
                    card.front_image_id,
                    card.back_image_id,
                    card.card_color,
                    card.color_opacity,
                    card.title_pick.map(|id| id.to_string()),
                ],
            )
            .map_err(persist)?;

        self.conn
            .execute(
                "DELETE FROM crops WHERE card_id = ?1",
                [card.id.to_string()],
            )
            .map_err(persist)?;
        for crop in card.crops() {
            self.conn
                .execute(
                    "INSERT INTO crops (card_id, side, x0, y0, x1, y1, score)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        card.id.to_string(),
                        crop.side().as_str(),
                        crop.x0(),
                        crop.y0(),
                        crop.x1(),
                        crop.y1(),
                        crop.score(),
                    ],
                )
                .map_err(persist)?;
        }

        self.conn
            .execute(
                "DELETE FROM card_entities WHERE card_id = ?1",
                [card.id.to_string()],
            )
            .map_err(persist)?;
        for kind in EntityKind::ALL {
            for (position, entity_id) in card.entity_ids(kind).iter().enumerate() {
                self.conn
                    .execute(
                        "INSERT INTO card_entities (card_id, entity_id, kind, position)
                         VALUES (?1, ?2, ?3, ?4)",
                        params![
                            card.id.to_string(),
                            entity_id.to_string(),
                            kind.as_str(),
                            position as i64,
                        ],
                    )
                    .map_err(persist)?;
            }
        }

        Ok(())
    }

    fn save_entity(&mut self, entity: &NamedEntity) -> Result<(), StoreError> {
        self.begin_if_needed()?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO entities (id, kind, text) VALUES (?1, ?2, ?3)",
                params![
                    entity.id.to_string(),
                    entity.kind.as_str(),
                    entity.text,
                ],
            )
            .map_err(persist)?;
        Ok(())
    }

    fn save_collection(&mut self, collection: &Collection) -> Result<(), StoreError> {
        self.begin_if_needed()?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO collections (id, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    collection.id.to_string(),
                    collection.name,
                    collection.created_at.to_rfc3339(),
                    collection.updated_at.to_rfc3339(),
                ],
            )
            .map_err(persist)?;

        self.conn
            .execute(
                "DELETE FROM collection_cards WHERE collection_id = ?1",
                [collection.id.to_string()],
            )
            .map_err(persist)?;
        for (position, card_id) in collection.members.ids().iter().enumerate() {
            self.conn
                .execute(
                    "INSERT INTO collection_cards (collection_id, card_id, position)
                     VALUES (?1, ?2, ?3)",
                    params![
                        collection.id.to_string(),
                        card_id.to_string(),
                        position as i64,
                    ],
                )
                .map_err(persist)?;
        }

        Ok(())
    }

    fn delete_card(&mut self, id: CardId) -> Result<(), StoreError> {
        self.begin_if_needed()?;
        self.conn
            .execute("DELETE FROM cards WHERE id = ?1", [id.to_string()])
            .map_err(persist)?;
        self.conn
            .execute(
                "DELETE FROM collection_cards WHERE card_id = ?1",
                [id.to_string()],
            )
            .map_err(persist)?;
        Ok(())
    }

    fn delete_collection(&mut self, id: CollectionId) -> Result<(), StoreError> {
        self.begin_if_needed()?;
        self.conn
            .execute("DELETE FROM collections WHERE id = ?1", [id.to_string()])
            .map_err(persist)?;
        Ok(())
    }

    fn load(&mut self) -> Result<Catalog, StoreError> {
        let mut catalog = Catalog::new();

        {
            let mut stmt = self
                .conn
                .prepare("SELECT id, kind, text FROM entities")
                .map_err(persist)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(persist)?;
            for row in rows {
                let (id, kind, text) = row.map_err(persist)?;
                let kind = EntityKind::from_str_opt(&kind)
                    .ok_or_else(|| StoreError::Corrupt(format!("entity kind `{kind}`")))?;
                let mut entity = NamedEntity::new(kind, text);
                entity.id = parse_uuid(&id)?;
                catalog.arena.insert_loaded(entity);
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare(
                    "SELECT id, front_image_id, back_image_id, card_color,
                            color_opacity, title_pick
                     FROM cards",
                )
                .map_err(persist)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, Option<String>>(5)?,
                    ))
                })
                .map_err(persist)?;
            for row in rows {
                let (id, front, back, color, opacity, pick) = row.map_err(persist)?;
                let id = parse_uuid(&id)?;
                let mut card = Card::new(id);
                card.front_image_id = front;
                card.back_image_id = back;
                card.card_color = color;
                card.color_opacity = opacity;
                card.title_pick = pick.as_deref().map(parse_uuid).transpose()?;
                catalog.cards.insert(id, card);
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare("SELECT card_id, side, x0, y0, x1, y1, score FROM crops")
                .map_err(persist)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, f64>(3)?,
                        row.get::<_, f64>(4)?,
                        row.get::<_, f64>(5)?,
                        row.get::<_, f64>(6)?,
                    ))
                })
                .map_err(persist)?;
            for row in rows {
                let (card_id, side, x0, y0, x1, y1, score) = row.map_err(persist)?;
                let card_id = parse_uuid(&card_id)?;
                let side = Side::from_str(&side)
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                let crop = Crop::new(
                    x0 as f32, y0 as f32, x1 as f32, y1 as f32, score as f32, side,
                )
                .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                if let Some(card) = catalog.cards.get_mut(&card_id) {
                    card.set_crop(crop);
                }
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare(
                    "SELECT card_id, entity_id, kind FROM card_entities
                     ORDER BY card_id, kind, position",
                )
                .map_err(persist)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })
                .map_err(persist)?;
            for row in rows {
                let (card_id, entity_id, kind) = row.map_err(persist)?;
                let card_id = parse_uuid(&card_id)?;
                let entity_id = parse_uuid(&entity_id)?;
                let kind = EntityKind::from_str_opt(&kind)
                    .ok_or_else(|| StoreError::Corrupt(format!("entity kind `{kind}`")))?;
                if let Some(card) = catalog.cards.get_mut(&card_id) {
                    card.attach_entity(kind, entity_id);
                    catalog.arena.link_card(entity_id, card_id);
                }
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare("SELECT id, name, created_at, updated_at FROM collections")
                .map_err(persist)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })
                .map_err(persist)?;
            for row in rows {
                let (id, name, created_at, updated_at) = row.map_err(persist)?;
                let id = parse_uuid(&id)?;
                let mut collection = Collection::new(name);
                collection.id = id;
                collection.created_at = parse_timestamp(&created_at)?;
                collection.updated_at = parse_timestamp(&updated_at)?;
                catalog.collections.insert(id, collection);
            }
        }

        {
            let mut stmt = self
                .conn
                .prepare(
                    "SELECT collection_id, card_id FROM collection_cards
                     ORDER BY collection_id, position",
                )
                .map_err(persist)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(persist)?;
            let mut orders: Vec<(CollectionId, CardId)> = Vec::new();
            for row in rows {
                let (collection_id, card_id) = row.map_err(persist)?;
                orders.push((parse_uuid(&collection_id)?, parse_uuid(&card_id)?));
            }
            for (collection_id, card_id) in orders {
                if let Some(collection) = catalog.collections.get_mut(&collection_id) {
                    collection.members.insert(card_id);
                }
            }
        }

        Ok(catalog)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if self.in_tx {
            self.conn.execute_batch("COMMIT").map_err(persist)?;
            self.in_tx = false;
        }
        Ok(())
    }
}

fn persist(e: rusqlite::Error) -> StoreError {
    StoreError::Persist(e.to_string())
}

fn parse_uuid(raw: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(raw).map_err(|_| StoreError::Corrupt(format!("uuid `{raw}`")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StoreError::Corrupt(format!("timestamp `{raw}`")))
}
