//! The batch import pipeline
//!
//! Records are applied one at a time through the catalog handle. A record
//! that fails validation is recorded as a rejection and the run continues;
//! only undecodable input or a persistence failure stops the batch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use verascope_catalog::{
    Catalog, CatalogError, CatalogHandle, CardRecord, CropFields, MergeOutcome,
};
use verascope_domain::{CardId, CollectionId, CropError};

use crate::error::ImportError;
use crate::payload::{
    decode_cards, decode_crops, CardImportRecord, CropUpdateRecord, ImportKind,
};
use crate::report::{ImportReport, RejectReason, Rejection};

/// Knobs for one import run.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Commit applied records to durable storage every N records.
    pub checkpoint_interval: usize,
    /// Add every accepted record's card to the named collection, creating it
    /// if absent. Applies to card and crop-only runs alike; order of addition
    /// follows input order.
    pub group_into: Option<String>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            checkpoint_interval: 100,
            group_into: None,
        }
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    Parsing,
    Processing,
    Checkpointing,
    Finalizing,
    Completed,
}

/// Progress snapshot published over the watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportProgress {
    pub phase: ImportPhase,
    pub processed: usize,
    pub total: usize,
}

/// Cooperative cancellation token shared with the caller.
///
/// Checked between records; an already-applied record stays applied, and the
/// final checkpoint still runs so nothing accepted is lost.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Drives one or more import runs against a catalog handle.
pub struct ImportPipeline {
    handle: CatalogHandle,
    options: ImportOptions,
    progress: Option<watch::Sender<ImportProgress>>,
    cancel: CancelFlag,
}

/// How a single record failed.
enum RecordFailure {
    Rejected(Rejection),
    Batch(ImportError),
}

impl ImportPipeline {
    pub fn new(handle: CatalogHandle, options: ImportOptions) -> Self {
        Self {
            handle,
            options,
            progress: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Token the caller can trip to stop the run between records.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Subscribe to progress snapshots for this pipeline's runs.
    pub fn subscribe_progress(&mut self) -> watch::Receiver<ImportProgress> {
        let initial = ImportProgress {
            phase: ImportPhase::Parsing,
            processed: 0,
            total: 0,
        };
        let sender = self
            .progress
            .get_or_insert_with(|| watch::channel(initial).0);
        sender.subscribe()
    }

    pub async fn run(
        &mut self,
        bytes: &[u8],
        kind: ImportKind,
    ) -> Result<ImportReport, ImportError> {
        match kind {
            ImportKind::Cards => self.run_cards(bytes).await,
            ImportKind::Crops => self.run_crops(bytes).await,
        }
    }

    /// Import full card records: parse, apply each through the coordinator,
    /// checkpoint on cadence, commit the remainder at the end.
    pub async fn run_cards(&mut self, bytes: &[u8]) -> Result<ImportReport, ImportError> {
        self.publish(ImportPhase::Parsing, 0, 0);
        let records = decode_cards(bytes)?;
        let total = records.len();
        let group = self.resolve_group().await?;

        let mut report = ImportReport::default();
        for (index, record) in records.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(processed = index, total, "import cancelled");
                break;
            }
            self.publish(ImportPhase::Processing, index, total);

            match self.apply_one_card(record, group).await {
                Ok(MergeOutcome::Created) => report.created += 1,
                Ok(MergeOutcome::Updated) => report.updated += 1,
                Err(RecordFailure::Rejected(rejection)) => {
                    tracing::warn!(
                        id = %rejection.id,
                        reason = ?rejection.reason,
                        "record rejected"
                    );
                    report.rejections.push(rejection);
                }
                Err(RecordFailure::Batch(err)) => return Err(err),
            }

            self.maybe_checkpoint(index + 1, total).await?;
        }

        self.finalize(&report, total).await?;
        Ok(report)
    }

    /// Import crop-only updates targeting existing cards.
    pub async fn run_crops(&mut self, bytes: &[u8]) -> Result<ImportReport, ImportError> {
        self.publish(ImportPhase::Parsing, 0, 0);
        let records = decode_crops(bytes)?;
        let total = records.len();
        let group = self.resolve_group().await?;

        let mut report = ImportReport::default();
        for (index, record) in records.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(processed = index, total, "import cancelled");
                break;
            }
            self.publish(ImportPhase::Processing, index, total);

            match self.apply_one_crop(record, group).await {
                Ok(()) => report.updated += 1,
                Err(RecordFailure::Rejected(rejection)) => {
                    tracing::warn!(
                        id = %rejection.id,
                        reason = ?rejection.reason,
                        "record rejected"
                    );
                    report.rejections.push(rejection);
                }
                Err(RecordFailure::Batch(err)) => return Err(err),
            }

            self.maybe_checkpoint(index + 1, total).await?;
        }

        self.finalize(&report, total).await?;
        Ok(report)
    }

    async fn apply_one_card(
        &self,
        record: &CardImportRecord,
        group: Option<CollectionId>,
    ) -> Result<MergeOutcome, RecordFailure> {
        let id = self.parse_id(&record.uuid)?;

        let card_record = CardRecord {
            id,
            titles: record.titles.clone(),
            authors: record.authors.clone(),
            subjects: record.subjects.clone(),
            dates: record.dates.clone(),
            front_image_id: record.image_ids.as_ref().and_then(|i| i.front.clone()),
            back_image_id: record.image_ids.as_ref().and_then(|i| i.back.clone()),
        };
        let left = record.left.as_ref().map(CropFields::from);
        let right = record.right.as_ref().map(CropFields::from);

        let outcome = self
            .handle
            .apply_card(card_record, left, right)
            .await
            .map_err(|err| classify(&record.uuid, err))?;

        if let Some(collection) = group {
            self.handle
                .add_to_collection(id, collection)
                .await
                .map_err(|err| RecordFailure::Batch(batch_error(err)))?;
        }

        Ok(outcome)
    }

    async fn apply_one_crop(
        &self,
        record: &CropUpdateRecord,
        group: Option<CollectionId>,
    ) -> Result<(), RecordFailure> {
        let id = self.parse_id(&record.uuid)?;
        let left = record.left.as_ref().map(CropFields::from);
        let right = record.right.as_ref().map(CropFields::from);

        self.handle
            .apply_crop_update(id, left, right)
            .await
            .map_err(|err| classify(&record.uuid, err))?;

        if let Some(collection) = group {
            self.handle
                .add_to_collection(id, collection)
                .await
                .map_err(|err| RecordFailure::Batch(batch_error(err)))?;
        }

        Ok(())
    }

    /// Resolve the grouping collection up front, creating it if configured.
    async fn resolve_group(&self) -> Result<Option<CollectionId>, ImportError> {
        match &self.options.group_into {
            Some(name) => Ok(Some(
                self.handle
                    .ensure_collection(name)
                    .await
                    .map_err(batch_error)?,
            )),
            None => Ok(None),
        }
    }

    fn parse_id(&self, raw: &str) -> Result<CardId, RecordFailure> {
        Catalog::parse_card_id(raw).map_err(|err| classify(raw, err))
    }

    /// Commit on the configured cadence. A store failure here is logged and
    /// the run continues; the work stays staged for the next checkpoint.
    async fn maybe_checkpoint(&self, done: usize, total: usize) -> Result<(), ImportError> {
        if self.options.checkpoint_interval == 0 || done % self.options.checkpoint_interval != 0 {
            return Ok(());
        }
        self.publish(ImportPhase::Checkpointing, done, total);
        match self.handle.checkpoint().await {
            Ok(()) => Ok(()),
            Err(CatalogError::Closed) => Err(ImportError::Closed),
            Err(err) => {
                tracing::warn!(error = %err, "checkpoint failed, continuing");
                Ok(())
            }
        }
    }

    /// The final commit is not optional: failing it means accepted records
    /// were never made durable, which fails the batch.
    async fn finalize(&self, report: &ImportReport, total: usize) -> Result<(), ImportError> {
        self.publish(ImportPhase::Finalizing, report.total_processed(), total);
        self.handle.checkpoint().await.map_err(batch_error)?;

        tracing::info!(
            created = report.created,
            updated = report.updated,
            rejected = report.rejections.len(),
            "import finished: {}",
            report.summary()
        );
        self.publish(ImportPhase::Completed, report.total_processed(), total);
        Ok(())
    }

    fn publish(&self, phase: ImportPhase, processed: usize, total: usize) {
        if let Some(sender) = &self.progress {
            sender.send_replace(ImportProgress {
                phase,
                processed,
                total,
            });
        }
    }
}

/// Partition a per-record catalog failure into a rejection or a batch abort.
fn classify(raw_id: &str, err: CatalogError) -> RecordFailure {
    let reason = match &err {
        CatalogError::MalformedIdentifier(_) => RejectReason::MalformedIdentifier,
        CatalogError::IncompleteRecord(_) => RejectReason::IncompleteRecord,
        CatalogError::TargetNotFound(_) => RejectReason::TargetNotFound,
        CatalogError::Crop(crop) => match crop {
            CropError::InvalidGeometry { .. } => RejectReason::InvalidGeometry,
            CropError::InvalidScore(_) => RejectReason::InvalidScore,
            CropError::InvalidSide(_) => RejectReason::InvalidSide,
            CropError::DuplicateSide(_) => RejectReason::DuplicateSide,
        },
        _ => return RecordFailure::Batch(batch_error(err)),
    };
    RecordFailure::Rejected(Rejection {
        id: raw_id.to_string(),
        reason,
        detail: err.to_string(),
    })
}

fn batch_error(err: CatalogError) -> ImportError {
    match err {
        CatalogError::Store(store) => ImportError::Persist(store),
        CatalogError::Closed => ImportError::Closed,
        other => ImportError::Catalog(other),
    }
}
