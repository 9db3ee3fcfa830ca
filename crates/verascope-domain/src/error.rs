//! Error types for domain-level validation

use thiserror::Error;

use crate::crop::Side;

/// Crop geometry, score, and side validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CropError {
    /// Rectangle coordinates are outside the unit square or degenerate.
    #[error("invalid crop geometry ({x0},{y0})-({x1},{y1})")]
    InvalidGeometry { x0: f32, y0: f32, x1: f32, y1: f32 },

    /// Confidence score outside [0, 1].
    #[error("invalid crop score {0}")]
    InvalidScore(f32),

    /// Side tag is neither `left` nor `right`.
    #[error("invalid crop side `{0}`")]
    InvalidSide(String),

    /// Two crops in one operation carry the same side tag.
    #[error("duplicate crop side `{0}`")]
    DuplicateSide(Side),
}

/// Ordered-membership errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// A replacement order must be a permutation of the current member ids.
    #[error("replacement order is not a permutation of the current members")]
    NotAPermutation,
}
