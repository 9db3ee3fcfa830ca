//! Catalog core for verascope
//!
//! Owns the in-memory catalog state and everything that mutates it:
//! - identity resolution ([`Catalog::parse_card_id`], [`Catalog::card`])
//! - record merging with create-vs-update reconciliation ([`merge`])
//! - ordered collection membership and automatic sorting ([`organize`])
//! - the [`CatalogStore`] persistence trait with SQLite and in-memory backends
//! - the [`coordinator`] actor that serializes all writes
//!
//! Callers hold a cloneable [`CatalogHandle`]; every mutation is a message
//! into a single consumer task, so concurrent imports and UI edits apply one
//! at a time and reads observe only fully-applied state.

pub mod catalog;
pub mod coordinator;
pub mod error;
pub mod merge;
pub mod organize;
pub mod sqlite_store;
pub mod store;

pub use catalog::Catalog;
pub use coordinator::{CatalogHandle, PersistenceCoordinator};
pub use error::{CatalogError, Result};
pub use merge::{merge_record, validate_crops, CardRecord, CropFields, MergeOutcome};
pub use organize::{sorted_order, SortStrategy};
pub use sqlite_store::SqliteCatalogStore;
pub use store::{CatalogStore, MemoryStore, StoreError};
