//! Majority quality color per region
//!
//! Strips are filtered by a caller-supplied window predicate (for example
//! "taken this calendar month"), strips outside every region are dropped,
//! and the remaining colors are counted per region. The most frequent color
//! wins; on a tie the color seen first in iteration order for that region
//! wins. Regions without strips are left out of the result.

use crate::QualityColor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// A strip with its resolved region and quality color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedSample {
    pub sample_id: u64,
    pub taken_at: DateTime<Utc>,
    /// `None` when the strip lies outside every region
    pub region: Option<String>,
    pub color: QualityColor,
}

/// Color counts for one region, kept in first-occurrence order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionColorTally {
    pub region_name: String,
    pub color_counts: Vec<(QualityColor, usize)>,
}

impl RegionColorTally {
    pub fn new(region_name: impl Into<String>) -> Self {
        Self {
            region_name: region_name.into(),
            color_counts: Vec::new(),
        }
    }

    pub fn record(&mut self, color: QualityColor) {
        match self.color_counts.iter_mut().find(|(c, _)| *c == color) {
            Some((_, count)) => *count += 1,
            None => self.color_counts.push((color, 1)),
        }
    }

    pub fn count(&self, color: QualityColor) -> usize {
        self.color_counts
            .iter()
            .find(|(c, _)| *c == color)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.color_counts.iter().map(|(_, n)| n).sum()
    }

    /// Most frequent color; ties go to the color recorded first
    pub fn majority(&self) -> Option<QualityColor> {
        let mut best: Option<(QualityColor, usize)> = None;
        for &(color, count) in &self.color_counts {
            // Strict comparison keeps the earlier color on ties
            if best.map_or(true, |(_, n)| count > n) {
                best = Some((color, count));
            }
        }
        best.map(|(color, _)| color)
    }
}

/// Count colors per region for the strips accepted by `window`.
///
/// Tallies come back in order of each region's first strip.
pub fn tally_region_colors<F>(samples: &[LocatedSample], window: F) -> Vec<RegionColorTally>
where
    F: Fn(&LocatedSample) -> bool,
{
    let mut tallies: Vec<RegionColorTally> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut outside_window = 0;
    let mut unlocated = 0;

    for sample in samples {
        if !window(sample) {
            outside_window += 1;
            continue;
        }
        let Some(region) = sample.region.as_deref() else {
            unlocated += 1;
            continue;
        };

        let slot = *index.entry(region).or_insert_with(|| {
            tallies.push(RegionColorTally::new(region));
            tallies.len() - 1
        });
        tallies[slot].record(sample.color);
    }

    debug!(
        "Tallied {} regions ({} strips outside window, {} outside every region)",
        tallies.len(),
        outside_window,
        unlocated
    );

    tallies
}

/// Majority color per region for the strips accepted by `window`
pub fn aggregate_region_colors<F>(
    samples: &[LocatedSample],
    window: F,
) -> HashMap<String, QualityColor>
where
    F: Fn(&LocatedSample) -> bool,
{
    let colors: HashMap<String, QualityColor> = tally_region_colors(samples, window)
        .into_iter()
        .filter_map(|tally| tally.majority().map(|color| (tally.region_name, color)))
        .collect();

    info!(
        "Aggregated colors for {} regions from {} strips",
        colors.len(),
        samples.len()
    );

    colors
}
