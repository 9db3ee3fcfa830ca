//! Batch-level import failures
//!
//! Per-record problems are not errors; they land in the report's rejection
//! list. An [`ImportError`] means the whole run stopped.

use thiserror::Error;
use verascope_catalog::{CatalogError, StoreError};

#[derive(Error, Debug)]
pub enum ImportError {
    /// The payload is not decodable JSON of the expected shape.
    #[error("malformed import payload: {0}")]
    MalformedInput(#[from] serde_json::Error),

    /// The store failed while finalizing; applied-but-uncommitted work may
    /// be lost.
    #[error(transparent)]
    Persist(#[from] StoreError),

    /// A catalog failure outside the per-record rejection categories.
    #[error(transparent)]
    Catalog(CatalogError),

    /// The persistence coordinator has shut down.
    #[error("catalog coordinator is closed")]
    Closed,
}
