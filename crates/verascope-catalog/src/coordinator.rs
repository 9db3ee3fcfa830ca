//! The persistence coordinator: single-consumer actor owning all catalog writes
//!
//! Every mutation (record merges, crop updates, membership edits, reorders)
//! is a [`Command`] message into one task that owns the [`Catalog`] and its
//! [`CatalogStore`]. Commands apply strictly one at a time in submission
//! order, so two concurrent imports, or an import racing a UI edit, can never
//! interleave partial writes. Reads are answered by the same task between
//! commands and therefore observe only fully-applied state.

use tokio::sync::{mpsc, oneshot};
use verascope_domain::{Card, CardId, CollectionId, EntityKind};

use crate::catalog::Catalog;
use crate::error::CatalogError;
use crate::merge::{merge_record, validate_crops, CardRecord, CropFields, MergeOutcome};
use crate::organize::{sorted_order, SortStrategy};
use crate::store::CatalogStore;

type Reply<T> = oneshot::Sender<Result<T, CatalogError>>;

enum Command {
    ApplyCard {
        record: CardRecord,
        left: Option<CropFields>,
        right: Option<CropFields>,
        reply: Reply<MergeOutcome>,
    },
    ApplyCropUpdate {
        id: CardId,
        left: Option<CropFields>,
        right: Option<CropFields>,
        reply: Reply<()>,
    },
    ResolveIdentifier {
        raw: String,
        reply: Reply<Option<CardId>>,
    },
    GetCard {
        id: CardId,
        reply: Reply<Option<Card>>,
    },
    CardCount {
        reply: Reply<usize>,
    },
    CreateCollection {
        name: String,
        reply: Reply<CollectionId>,
    },
    EnsureCollection {
        name: String,
        reply: Reply<CollectionId>,
    },
    DeleteCollection {
        id: CollectionId,
        reply: Reply<()>,
    },
    AddToCollection {
        card: CardId,
        collection: CollectionId,
        reply: Reply<bool>,
    },
    RemoveFromCollection {
        card: CardId,
        collection: CollectionId,
        reply: Reply<bool>,
    },
    HasCard {
        card: CardId,
        collection: CollectionId,
        reply: Reply<bool>,
    },
    OrderedView {
        collection: CollectionId,
        reply: Reply<Vec<Card>>,
    },
    Reorder {
        collection: CollectionId,
        order: Vec<CardId>,
        reply: Reply<()>,
    },
    SortCollection {
        collection: CollectionId,
        strategy: SortStrategy,
        reply: Reply<()>,
    },
    Checkpoint {
        reply: Reply<()>,
    },
}

/// Cloneable handle to the coordinator task.
///
/// All methods are async; mutations suspend until the task has applied the
/// change. A handle whose task has stopped yields [`CatalogError::Closed`].
#[derive(Clone)]
pub struct CatalogHandle {
    tx: mpsc::Sender<Command>,
}

impl CatalogHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, CatalogError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| CatalogError::Closed)?;
        rx.await.map_err(|_| CatalogError::Closed)?
    }

    /// Merge a full card record, then validate and attach its crops.
    pub async fn apply_card(
        &self,
        record: CardRecord,
        left: Option<CropFields>,
        right: Option<CropFields>,
    ) -> Result<MergeOutcome, CatalogError> {
        self.request(|reply| Command::ApplyCard {
            record,
            left,
            right,
            reply,
        })
        .await
    }

    /// Replace the crops of an existing card.
    pub async fn apply_crop_update(
        &self,
        id: CardId,
        left: Option<CropFields>,
        right: Option<CropFields>,
    ) -> Result<(), CatalogError> {
        self.request(|reply| Command::ApplyCropUpdate {
            id,
            left,
            right,
            reply,
        })
        .await
    }

    /// Parse an external identifier and look up the matching card, if any.
    pub async fn resolve_identifier(&self, raw: &str) -> Result<Option<CardId>, CatalogError> {
        let raw = raw.to_string();
        self.request(|reply| Command::ResolveIdentifier { raw, reply })
            .await
    }

    pub async fn card(&self, id: CardId) -> Result<Option<Card>, CatalogError> {
        self.request(|reply| Command::GetCard { id, reply }).await
    }

    pub async fn card_count(&self) -> Result<usize, CatalogError> {
        self.request(|reply| Command::CardCount { reply }).await
    }

    pub async fn create_collection(&self, name: &str) -> Result<CollectionId, CatalogError> {
        let name = name.to_string();
        self.request(|reply| Command::CreateCollection { name, reply })
            .await
    }

    /// Reuse the collection with this name, creating it if absent.
    pub async fn ensure_collection(&self, name: &str) -> Result<CollectionId, CatalogError> {
        let name = name.to_string();
        self.request(|reply| Command::EnsureCollection { name, reply })
            .await
    }

    /// Delete a collection, detaching (not deleting) its member cards.
    pub async fn delete_collection(&self, id: CollectionId) -> Result<(), CatalogError> {
        self.request(|reply| Command::DeleteCollection { id, reply })
            .await
    }

    /// Idempotent add; returns whether the collection changed.
    pub async fn add_to_collection(
        &self,
        card: CardId,
        collection: CollectionId,
    ) -> Result<bool, CatalogError> {
        self.request(|reply| Command::AddToCollection {
            card,
            collection,
            reply,
        })
        .await
    }

    /// Idempotent remove; returns whether the collection changed.
    pub async fn remove_from_collection(
        &self,
        card: CardId,
        collection: CollectionId,
    ) -> Result<bool, CatalogError> {
        self.request(|reply| Command::RemoveFromCollection {
            card,
            collection,
            reply,
        })
        .await
    }

    pub async fn has_card(
        &self,
        card: CardId,
        collection: CollectionId,
    ) -> Result<bool, CatalogError> {
        self.request(|reply| Command::HasCard {
            card,
            collection,
            reply,
        })
        .await
    }

    /// Member cards in explicit order, orphaned ids silently skipped.
    pub async fn ordered_view(&self, collection: CollectionId) -> Result<Vec<Card>, CatalogError> {
        self.request(|reply| Command::OrderedView { collection, reply })
            .await
    }

    /// Atomically replace a collection's order with a permutation of itself.
    pub async fn reorder(
        &self,
        collection: CollectionId,
        order: Vec<CardId>,
    ) -> Result<(), CatalogError> {
        self.request(|reply| Command::Reorder {
            collection,
            order,
            reply,
        })
        .await
    }

    pub async fn sort_collection(
        &self,
        collection: CollectionId,
        strategy: SortStrategy,
    ) -> Result<(), CatalogError> {
        self.request(|reply| Command::SortCollection {
            collection,
            strategy,
            reply,
        })
        .await
    }

    /// Commit all writes since the previous checkpoint.
    pub async fn checkpoint(&self) -> Result<(), CatalogError> {
        self.request(|reply| Command::Checkpoint { reply }).await
    }
}

/// Owns the catalog state and its store; applies commands one at a time.
pub struct PersistenceCoordinator {
    catalog: Catalog,
    store: Box<dyn CatalogStore>,
}

impl PersistenceCoordinator {
    /// Load the committed catalog from the store and start the coordinator
    /// task. Must be called within a tokio runtime.
    pub fn spawn(mut store: Box<dyn CatalogStore>) -> Result<CatalogHandle, CatalogError> {
        let catalog = store.load()?;
        tracing::debug!(
            cards = catalog.cards.len(),
            collections = catalog.collections.len(),
            "catalog coordinator starting"
        );

        let (tx, rx) = mpsc::channel(64);
        let coordinator = Self { catalog, store };
        tokio::spawn(coordinator.run(rx));
        Ok(CatalogHandle { tx })
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        tracing::debug!("catalog coordinator stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::ApplyCard {
                record,
                left,
                right,
                reply,
            } => {
                let result = self.apply_card(&record, left.as_ref(), right.as_ref());
                let _ = reply.send(result);
            }
            Command::ApplyCropUpdate {
                id,
                left,
                right,
                reply,
            } => {
                let result = self.apply_crop_update(id, left.as_ref(), right.as_ref());
                let _ = reply.send(result);
            }
            Command::ResolveIdentifier { raw, reply } => {
                let result = Catalog::parse_card_id(&raw)
                    .map(|id| self.catalog.card(id).map(|card| card.id));
                let _ = reply.send(result);
            }
            Command::GetCard { id, reply } => {
                let _ = reply.send(Ok(self.catalog.card(id).cloned()));
            }
            Command::CardCount { reply } => {
                let _ = reply.send(Ok(self.catalog.cards.len()));
            }
            Command::CreateCollection { name, reply } => {
                let _ = reply.send(self.create_collection(name));
            }
            Command::EnsureCollection { name, reply } => {
                let result = match self.catalog.collection_by_name(&name) {
                    Some(id) => Ok(id),
                    None => self.create_collection(name),
                };
                let _ = reply.send(result);
            }
            Command::DeleteCollection { id, reply } => {
                let result = self
                    .catalog
                    .delete_collection(id)
                    .and_then(|_| self.store.delete_collection(id).map_err(Into::into));
                let _ = reply.send(result);
            }
            Command::AddToCollection {
                card,
                collection,
                reply,
            } => {
                let _ = reply.send(self.add_to_collection(card, collection));
            }
            Command::RemoveFromCollection {
                card,
                collection,
                reply,
            } => {
                let _ = reply.send(self.remove_from_collection(card, collection));
            }
            Command::HasCard {
                card,
                collection,
                reply,
            } => {
                let result = self
                    .catalog
                    .collection(collection)
                    .ok_or(CatalogError::CollectionNotFound(collection))
                    .map(|c| c.has_card(card));
                let _ = reply.send(result);
            }
            Command::OrderedView { collection, reply } => {
                let result = self
                    .catalog
                    .ordered_view(collection)
                    .map(|cards| cards.into_iter().cloned().collect());
                let _ = reply.send(result);
            }
            Command::Reorder {
                collection,
                order,
                reply,
            } => {
                let _ = reply.send(self.reorder(collection, order));
            }
            Command::SortCollection {
                collection,
                strategy,
                reply,
            } => {
                let _ = reply.send(self.sort_collection(collection, strategy));
            }
            Command::Checkpoint { reply } => {
                let _ = reply.send(self.store.commit().map_err(Into::into));
            }
        }
    }

    /// Merge metadata first, then validate and attach crops. A crop failure
    /// leaves the already-merged metadata in place; the caller reports the
    /// record as rejected on the crop fields.
    fn apply_card(
        &mut self,
        record: &CardRecord,
        left: Option<&CropFields>,
        right: Option<&CropFields>,
    ) -> Result<MergeOutcome, CatalogError> {
        let outcome = merge_record(&mut self.catalog, record)?;
        self.stage_card(record.id)?;

        let crops = validate_crops(left, right)?;
        if !crops.is_empty() {
            let card = self
                .catalog
                .cards
                .get_mut(&record.id)
                .ok_or(CatalogError::TargetNotFound(record.id))?;
            for crop in crops {
                card.set_crop(crop);
            }
            self.stage_card(record.id)?;
        }

        Ok(outcome)
    }

    /// Crop-only update: the card must already exist. Both crops are
    /// validated before either is attached; replacement per side is atomic.
    fn apply_crop_update(
        &mut self,
        id: CardId,
        left: Option<&CropFields>,
        right: Option<&CropFields>,
    ) -> Result<(), CatalogError> {
        if !self.catalog.cards.contains_key(&id) {
            return Err(CatalogError::TargetNotFound(id));
        }
        let crops = validate_crops(left, right)?;

        let card = self
            .catalog
            .cards
            .get_mut(&id)
            .ok_or(CatalogError::TargetNotFound(id))?;
        for crop in crops {
            card.set_crop(crop);
        }
        self.stage_card(id)
    }

    fn create_collection(&mut self, name: String) -> Result<CollectionId, CatalogError> {
        let collection = verascope_domain::Collection::new(name);
        let id = collection.id;
        self.catalog.collections.insert(id, collection);
        self.stage_collection(id)?;
        Ok(id)
    }

    fn add_to_collection(
        &mut self,
        card: CardId,
        collection: CollectionId,
    ) -> Result<bool, CatalogError> {
        if !self.catalog.cards.contains_key(&card) {
            return Err(CatalogError::TargetNotFound(card));
        }
        let coll = self
            .catalog
            .collections
            .get_mut(&collection)
            .ok_or(CatalogError::CollectionNotFound(collection))?;
        let added = coll.add_card(card);
        if added {
            self.stage_collection(collection)?;
        }
        Ok(added)
    }

    fn remove_from_collection(
        &mut self,
        card: CardId,
        collection: CollectionId,
    ) -> Result<bool, CatalogError> {
        let coll = self
            .catalog
            .collections
            .get_mut(&collection)
            .ok_or(CatalogError::CollectionNotFound(collection))?;
        let removed = coll.remove_card(card);
        if removed {
            self.stage_collection(collection)?;
        }
        Ok(removed)
    }

    fn reorder(
        &mut self,
        collection: CollectionId,
        order: Vec<CardId>,
    ) -> Result<(), CatalogError> {
        let coll = self
            .catalog
            .collections
            .get_mut(&collection)
            .ok_or(CatalogError::CollectionNotFound(collection))?;
        coll.reorder(order)?;
        self.stage_collection(collection)
    }

    fn sort_collection(
        &mut self,
        collection: CollectionId,
        strategy: SortStrategy,
    ) -> Result<(), CatalogError> {
        let coll = self
            .catalog
            .collection(collection)
            .ok_or(CatalogError::CollectionNotFound(collection))?;
        let order = sorted_order(&self.catalog, coll, strategy);
        self.reorder(collection, order)
    }

    /// Write a card and the entities it references through to the store.
    fn stage_card(&mut self, id: CardId) -> Result<(), CatalogError> {
        let card = self
            .catalog
            .cards
            .get(&id)
            .ok_or(CatalogError::TargetNotFound(id))?;
        // entities first: the card's relationship rows reference them
        for kind in EntityKind::ALL {
            for entity_id in card.entity_ids(kind) {
                if let Some(entity) = self.catalog.arena.get(*entity_id) {
                    self.store.save_entity(entity)?;
                }
            }
        }
        self.store.save_card(card)?;
        Ok(())
    }

    fn stage_collection(&mut self, id: CollectionId) -> Result<(), CatalogError> {
        let collection = self
            .catalog
            .collections
            .get(&id)
            .ok_or(CatalogError::CollectionNotFound(id))?;
        self.store.save_collection(collection)?;
        Ok(())
    }
}
