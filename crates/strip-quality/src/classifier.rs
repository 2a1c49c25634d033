//! Per-measurement classification against parameter ranges
//!
//! A value is compared with its parameter's acceptable range, inclusive at
//! both bounds:
//!
//! ```text
//! value < min          → BelowRange
//! value > max          → AboveRange
//! min ≤ value ≤ max    → WithinRange
//! ```
//!
//! An absent bound never triggers. Measurements that cannot be classified
//! are skipped and reported as [`ClassificationGap`]s so one bad row never
//! aborts a strip.

use crate::{QualityError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Acceptable range for one measured parameter.
///
/// Only built through [`ParameterRange::new`], so bounds are always finite
/// and ordered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterRange {
    parameter_id: u32,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    min: Option<f64>,
    max: Option<f64>,
}

impl ParameterRange {
    /// Build a range, rejecting non-finite bounds and `min > max`.
    pub fn new(
        parameter_id: u32,
        name: impl Into<String>,
        unit: Option<String>,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Result<Self> {
        let invalid = |reason: String| QualityError::InvalidRange {
            parameter_id,
            reason,
        };

        if min.is_some_and(|v| !v.is_finite()) || max.is_some_and(|v| !v.is_finite()) {
            return Err(invalid("bounds must be finite".to_string()));
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(invalid(format!("min {} exceeds max {}", lo, hi)));
            }
        }

        Ok(Self {
            parameter_id,
            name: name.into(),
            unit,
            min,
            max,
        })
    }

    /// Closed range with both bounds present
    pub fn bounded(parameter_id: u32, name: impl Into<String>, min: f64, max: f64) -> Result<Self> {
        Self::new(parameter_id, name, None, Some(min), Some(max))
    }

    pub fn parameter_id(&self) -> u32 {
        self.parameter_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

/// One measured value on one strip
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub sample_id: u64,
    pub parameter_id: u32,
    pub value: f64,
}

/// Where a value falls relative to its range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    BelowRange,
    WithinRange,
    AboveRange,
}

impl Verdict {
    pub fn is_within(&self) -> bool {
        matches!(self, Verdict::WithinRange)
    }

    fn phrase(&self) -> &'static str {
        match self {
            Verdict::BelowRange => "is below its defined range",
            Verdict::WithinRange => "is within its defined range",
            Verdict::AboveRange => "is above its defined range",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationOutcome {
    pub parameter_name: String,
    pub value: f64,
    pub verdict: Verdict,
    pub message: String,
}

/// A measurement that was skipped instead of classified
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ClassificationGap {
    /// No range is defined for the measurement's parameter
    MissingRange { sample_id: u64, parameter_id: u32 },
    /// The measured value is NaN or infinite
    InvalidMeasurement {
        sample_id: u64,
        parameter_id: u32,
        value: f64,
    },
}

/// Outcomes in measurement order plus any skipped measurements
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub outcomes: Vec<ClassificationOutcome>,
    pub gaps: Vec<ClassificationGap>,
}

/// Classify one value against one range
pub fn classify(value: f64, range: &ParameterRange) -> ClassificationOutcome {
    let verdict = match (range.min, range.max) {
        (Some(min), _) if value < min => Verdict::BelowRange,
        (_, Some(max)) if value > max => Verdict::AboveRange,
        _ => Verdict::WithinRange,
    };

    ClassificationOutcome {
        parameter_name: range.name.clone(),
        value,
        verdict,
        message: format!("Parameter \"{}\" {}", range.name, verdict.phrase()),
    }
}

/// Classify a strip's measurements in the order given.
///
/// Measurements without a range, or with a non-finite value, are skipped
/// and reported in [`Classification::gaps`].
pub fn classify_measurements(
    measurements: &[Measurement],
    ranges: &HashMap<u32, ParameterRange>,
) -> Classification {
    let mut classification = Classification::default();

    for m in measurements {
        let Some(range) = ranges.get(&m.parameter_id) else {
            warn!(
                "Sample {}: no range for parameter {}, skipping measurement",
                m.sample_id, m.parameter_id
            );
            classification.gaps.push(ClassificationGap::MissingRange {
                sample_id: m.sample_id,
                parameter_id: m.parameter_id,
            });
            continue;
        };

        if !m.value.is_finite() {
            warn!(
                "Sample {}: non-finite value {} for parameter {}, skipping measurement",
                m.sample_id, m.value, m.parameter_id
            );
            classification.gaps.push(ClassificationGap::InvalidMeasurement {
                sample_id: m.sample_id,
                parameter_id: m.parameter_id,
                value: m.value,
            });
            continue;
        }

        let outcome = classify(m.value, range);
        debug!(
            "Sample {}: {} = {} -> {:?}",
            m.sample_id, outcome.parameter_name, m.value, outcome.verdict
        );
        classification.outcomes.push(outcome);
    }

    classification
}
