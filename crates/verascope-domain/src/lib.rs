//! Domain types for the verascope stereocard catalog
//!
//! This crate provides the canonical domain models shared by the catalog and
//! import layers:
//! - Card: a stereoscopic card with metadata, image references, and crops
//! - Crop: a validated, normalized rectangular region of one card face
//! - NamedEntity + EntityArena: shared, deduplicated titles/authors/subjects/dates
//! - Collection + OrderedMembers: orderable card groupings
//!
//! Everything here is plain data with constructor-enforced invariants; no I/O.

pub mod card;
pub mod collection;
pub mod crop;
pub mod entity;
pub mod error;

pub use card::*;
pub use collection::*;
pub use crop::*;
pub use entity::*;
pub use error::*;
