//! Error types for catalog operations

use thiserror::Error;
use verascope_domain::{CardId, CollectionId, CropError, OrderError};

use crate::store::StoreError;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Main error type for catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// External identifier is not a valid card identity encoding.
    #[error("malformed identifier `{0}`")]
    MalformedIdentifier(String),

    /// Incoming record is missing a required field.
    #[error("incomplete record: {0}")]
    IncompleteRecord(&'static str),

    /// An update addressed a card that does not exist.
    #[error("no card with identity {0}")]
    TargetNotFound(CardId),

    /// Collection lookup failed.
    #[error("collection not found: {0}")]
    CollectionNotFound(CollectionId),

    /// Crop validation failure.
    #[error(transparent)]
    Crop(#[from] CropError),

    /// Order-replacement failure.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Persistence failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The coordinator task is no longer running.
    #[error("catalog coordinator is shut down")]
    Closed,
}
