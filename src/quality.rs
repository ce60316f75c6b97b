//! # Contact Quality Module
//!
//! Per-frame heuristic judging whether the raw camera sample looks like a
//! fingertip pressed over the lens. The score is advisory feedback for the
//! user; it never gates the heart-rate pipeline.

use crate::config::QualityConfig;
use crate::timeseries::Sample;
use serde::Serialize;

/// Sensor contact classification for a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactLevel {
    /// Green below the engagement threshold; nothing covers the sensor
    NoContact,
    /// Green clearly dominates both other channels
    Good,
    /// Green dominates, but only narrowly
    Fair,
    Poor,
}

impl ContactLevel {
    pub fn score(&self) -> f64 {
        match self {
            ContactLevel::NoContact => 0.1,
            ContactLevel::Good => 0.9,
            ContactLevel::Fair => 0.5,
            ContactLevel::Poor => 0.2,
        }
    }
}

pub struct SignalQualityAssessor {
    config: QualityConfig,
}

impl SignalQualityAssessor {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, sample: &Sample) -> ContactLevel {
        let margin = self.config.channel_margin;

        if sample.green < self.config.min_green {
            ContactLevel::NoContact
        } else if sample.green > sample.red + margin && sample.green > sample.blue + margin {
            ContactLevel::Good
        } else if sample.green > sample.red && sample.green > sample.blue {
            ContactLevel::Fair
        } else {
            ContactLevel::Poor
        }
    }

    /// Quality score in [0, 1] for one frame.
    pub fn score(&self, sample: &Sample) -> f64 {
        self.classify(sample).score()
    }
}
