//! Validated stereo crop geometry

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::CropError;

/// Which half of the stereo pair a crop selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = CropError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            other => Err(CropError::InvalidSide(other.to_string())),
        }
    }
}

/// A normalized rectangular region of one card face, with a detection
/// confidence score.
///
/// Constructed only through [`Crop::new`], which rejects out-of-range or
/// degenerate geometry, so a held `Crop` is always valid. A crop is replaced
/// as a unit; it is never partially updated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Crop {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    score: f32,
    side: Side,
}

impl Crop {
    /// Validate coordinates and score, returning an immutable crop.
    ///
    /// Requires 0 <= x0 < x1 <= 1, 0 <= y0 < y1 <= 1 and 0 <= score <= 1.
    /// NaN coordinates are rejected.
    pub fn new(
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        score: f32,
        side: Side,
    ) -> Result<Self, CropError> {
        let unit = |v: f32| (0.0..=1.0).contains(&v);
        if !(unit(x0) && unit(x1) && unit(y0) && unit(y1)) || x0 >= x1 || y0 >= y1 {
            return Err(CropError::InvalidGeometry { x0, y0, x1, y1 });
        }
        if !unit(score) {
            return Err(CropError::InvalidScore(score));
        }
        Ok(Self {
            x0,
            y0,
            x1,
            y1,
            score,
            side,
        })
    }

    pub fn x0(&self) -> f32 {
        self.x0
    }

    pub fn y0(&self) -> f32 {
        self.y0
    }

    pub fn x1(&self) -> f32 {
        self.x1
    }

    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})->({},{})", self.x0, self.y0, self.x1, self.y1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_crop() {
        let crop = Crop::new(0.1, 0.2, 0.9, 0.8, 0.95, Side::Left).unwrap();
        assert_eq!(crop.side(), Side::Left);
        assert_eq!(crop.to_string(), "(0.1,0.2)->(0.9,0.8)");
    }

    #[test]
    fn rejects_out_of_range_coordinate() {
        let err = Crop::new(1.2, 0.0, 1.5, 1.0, 0.5, Side::Left).unwrap_err();
        assert!(matches!(err, CropError::InvalidGeometry { .. }));
    }

    #[test]
    fn rejects_degenerate_rectangle() {
        let err = Crop::new(0.5, 0.0, 0.5, 1.0, 0.5, Side::Right).unwrap_err();
        assert!(matches!(err, CropError::InvalidGeometry { .. }));

        let err = Crop::new(0.0, 0.7, 1.0, 0.3, 0.5, Side::Right).unwrap_err();
        assert!(matches!(err, CropError::InvalidGeometry { .. }));
    }

    #[test]
    fn rejects_nan() {
        let err = Crop::new(f32::NAN, 0.0, 1.0, 1.0, 0.5, Side::Left).unwrap_err();
        assert!(matches!(err, CropError::InvalidGeometry { .. }));
    }

    #[test]
    fn rejects_bad_score() {
        let err = Crop::new(0.0, 0.0, 1.0, 1.0, 1.5, Side::Left).unwrap_err();
        assert!(matches!(err, CropError::InvalidScore(_)));
    }

    #[test]
    fn side_parsing() {
        assert_eq!("left".parse::<Side>().unwrap(), Side::Left);
        assert_eq!("right".parse::<Side>().unwrap(), Side::Right);
        assert!(matches!(
            "top".parse::<Side>(),
            Err(CropError::InvalidSide(s)) if s == "top"
        ));
    }
}
