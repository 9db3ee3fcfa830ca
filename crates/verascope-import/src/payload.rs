//! Wire shapes of the JSON import payloads

use serde::Deserialize;
use verascope_catalog::CropFields;

use crate::error::ImportError;

/// Which payload shape a batch carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// Full card records with metadata and optional crops.
    Cards,
    /// Crop-only updates targeting existing cards.
    Crops,
}

/// One full card record as it appears on the wire.
///
/// Only `uuid` is structurally required; everything else defaults so that
/// sparse records decode and fail (or not) on semantics, not on shape.
#[derive(Debug, Clone, Deserialize)]
pub struct CardImportRecord {
    pub uuid: String,
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    pub image_ids: Option<ImageIds>,
    pub left: Option<CropPayload>,
    pub right: Option<CropPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageIds {
    pub front: Option<String>,
    pub back: Option<String>,
}

/// Crop geometry as exported by the detector.
///
/// Crop-only exports label the side field `class`; full card records label
/// it `side`. Both decode into the same shape.
#[derive(Debug, Clone, Deserialize)]
pub struct CropPayload {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub score: f32,
    #[serde(alias = "class")]
    pub side: String,
}

/// A crop-only update for a card that must already exist.
#[derive(Debug, Clone, Deserialize)]
pub struct CropUpdateRecord {
    pub uuid: String,
    pub left: Option<CropPayload>,
    pub right: Option<CropPayload>,
}

pub fn decode_cards(bytes: &[u8]) -> Result<Vec<CardImportRecord>, ImportError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn decode_crops(bytes: &[u8]) -> Result<Vec<CropUpdateRecord>, ImportError> {
    Ok(serde_json::from_slice(bytes)?)
}

impl From<&CropPayload> for CropFields {
    fn from(payload: &CropPayload) -> Self {
        CropFields {
            x0: payload.x0,
            y0: payload.y0,
            x1: payload.x1,
            y1: payload.y1,
            score: payload.score,
            side: payload.side.clone(),
        }
    }
}
