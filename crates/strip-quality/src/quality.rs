//! Strip-level quality verdict
//!
//! Any out-of-range measurement taints the strip unless every measurement
//! is out of range. This is not a majority vote: one outlier among many
//! good readings still yields `Mixed`.

use crate::classifier::{
    classify_measurements, ClassificationGap, ClassificationOutcome, Measurement, ParameterRange,
};
use crate::QualityColor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Separator used when the messages are stored as one text field
pub const SUMMARY_SEPARATOR: &str = " , ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OverallVerdict {
    AllWithin,
    AllOutside,
    Mixed,
}

/// Verdict, color and messages for one strip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleQualityResult {
    pub sample_id: u64,
    pub overall: OverallVerdict,
    pub color: QualityColor,
    /// One message per classified measurement, in measurement order
    pub messages: Vec<String>,
}

impl SampleQualityResult {
    /// Messages joined into the single quality text stored on the strip
    pub fn summary(&self) -> String {
        self.messages.join(SUMMARY_SEPARATOR)
    }
}

/// Result of evaluating one strip, with the measurements that were skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleEvaluation {
    pub result: SampleQualityResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gaps: Vec<ClassificationGap>,
}

/// Combine a strip's classification outcomes into one verdict and color
pub fn aggregate(sample_id: u64, outcomes: &[ClassificationOutcome]) -> SampleQualityResult {
    let (overall, color) = if outcomes.is_empty() {
        (OverallVerdict::Mixed, QualityColor::Unknown)
    } else if outcomes.iter().all(|o| o.verdict.is_within()) {
        (OverallVerdict::AllWithin, QualityColor::Good)
    } else if outcomes.iter().all(|o| !o.verdict.is_within()) {
        (OverallVerdict::AllOutside, QualityColor::Bad)
    } else {
        (OverallVerdict::Mixed, QualityColor::Caution)
    };

    debug!(
        "Sample {}: {} outcomes -> {:?} ({})",
        sample_id,
        outcomes.len(),
        overall,
        color.hex()
    );

    SampleQualityResult {
        sample_id,
        overall,
        color,
        messages: outcomes.iter().map(|o| o.message.clone()).collect(),
    }
}

/// Classify a strip's measurements and aggregate the outcomes
pub fn evaluate_sample(
    sample_id: u64,
    measurements: &[Measurement],
    ranges: &HashMap<u32, ParameterRange>,
) -> SampleEvaluation {
    let classification = classify_measurements(measurements, ranges);

    SampleEvaluation {
        result: aggregate(sample_id, &classification.outcomes),
        gaps: classification.gaps,
    }
}
