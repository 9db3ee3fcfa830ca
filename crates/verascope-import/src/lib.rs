//! Batch import pipeline for verascope
//!
//! Decodes JSON card and crop payloads, feeds them record by record through
//! the catalog's persistence coordinator, and reports per-record outcomes.
//! Individual bad records are partitioned into a rejection list; the batch
//! only fails on input that cannot be decoded at all or on persistence
//! failures that would lose applied work.

pub mod error;
pub mod payload;
pub mod pipeline;
pub mod report;

pub use error::ImportError;
pub use payload::{decode_cards, decode_crops, CardImportRecord, CropUpdateRecord, ImportKind};
pub use pipeline::{CancelFlag, ImportOptions, ImportPhase, ImportPipeline, ImportProgress};
pub use report::{ImportReport, RejectReason, Rejection};
