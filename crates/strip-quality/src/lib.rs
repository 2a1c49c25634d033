//! Water Test Strip Quality
//!
//! Classifies the measurements of a water test strip against each
//! parameter's acceptable range, derives one verdict and color per strip,
//! and shades map regions by the majority color of the strips located in
//! them.
//!
//! # Pipeline
//!
//! ```text
//! measurements + ranges ──► classifier ──► quality ──► color per strip
//! DMS text ──► coords ──► region ──┐
//!                                  ├──► tally ──► region → color
//! color per strip ─────────────────┘
//! ```
//!
//! # Sample Rule
//!
//! | Outcomes                 | Overall      | Color     |
//! |--------------------------|--------------|-----------|
//! | none                     | `Mixed`      | `Unknown` |
//! | all within range         | `AllWithin`  | `Good`    |
//! | none within range        | `AllOutside` | `Bad`     |
//! | anything else            | `Mixed`      | `Caution` |

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod classifier;
pub mod coords;
pub mod loader;
pub mod quality;
pub mod region;
pub mod report;
pub mod tally;

pub use classifier::{
    classify, classify_measurements, Classification, ClassificationGap, ClassificationOutcome,
    Measurement, ParameterRange, Verdict,
};
pub use coords::{format_dms, parse_dms, parse_point, Axis, GeoPoint};
pub use quality::{aggregate, evaluate_sample, OverallVerdict, SampleEvaluation, SampleQualityResult};
pub use region::{Region, RegionLocator};
pub use tally::{aggregate_region_colors, tally_region_colors, LocatedSample, RegionColorTally};

/// Hex code stored for strips whose measurements are all within range
pub const GOOD_HEX: &str = "#00FF00";
/// Hex code stored for strips with some measurements out of range
pub const CAUTION_HEX: &str = "#FFFF00";
/// Hex code stored for strips whose measurements are all out of range
pub const BAD_HEX: &str = "#FF0000";
/// Hex code for strips that could not be classified
pub const UNKNOWN_HEX: &str = "#808080";

/// Alternative "good" green used by older map records
pub const LEGACY_GOOD_HEX: &str = "#00C951";

/// GeoJSON feature property holding the region name by default
pub const DEFAULT_REGION_NAME_PROPERTY: &str = "NAME_1";

#[derive(Error, Debug)]
pub enum QualityError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
    #[error("Malformed coordinate {text:?}: {reason}")]
    MalformedCoordinate { text: String, reason: String },
    #[error("Invalid range for parameter {parameter_id}: {reason}")]
    InvalidRange { parameter_id: u32, reason: String },
    #[error("Unknown quality color: {0}")]
    UnknownColor(String),
    #[error("Invalid region {name:?}: {reason}")]
    InvalidRegion { name: String, reason: String },
}

pub type Result<T> = std::result::Result<T, QualityError>;

/// Representative color of a strip's quality.
///
/// Serialized as the hex code stored on the strip record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum QualityColor {
    Good,
    Caution,
    Bad,
    /// Sentinel for strips with nothing to classify
    Unknown,
}

impl QualityColor {
    pub fn hex(&self) -> &'static str {
        match self {
            Self::Good => GOOD_HEX,
            Self::Caution => CAUTION_HEX,
            Self::Bad => BAD_HEX,
            Self::Unknown => UNKNOWN_HEX,
        }
    }

    /// Parse a stored hex code (case-insensitive)
    pub fn from_hex(hex: &str) -> Result<Self> {
        let normalized = hex.trim().to_ascii_uppercase();
        match normalized.as_str() {
            GOOD_HEX | LEGACY_GOOD_HEX => Ok(Self::Good),
            CAUTION_HEX => Ok(Self::Caution),
            BAD_HEX => Ok(Self::Bad),
            UNKNOWN_HEX => Ok(Self::Unknown),
            _ => Err(QualityError::UnknownColor(hex.to_string())),
        }
    }

    /// Two-level status shown in the region list
    pub fn status(&self) -> RegionStatus {
        match self {
            Self::Good => RegionStatus::Good,
            _ => RegionStatus::Bad,
        }
    }
}

impl From<QualityColor> for String {
    fn from(color: QualityColor) -> Self {
        color.hex().to_string()
    }
}

impl TryFrom<String> for QualityColor {
    type Error = QualityError;

    fn try_from(hex: String) -> Result<Self> {
        Self::from_hex(&hex)
    }
}

/// Good/bad label displayed next to a region name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionStatus {
    Good,
    Bad,
}
