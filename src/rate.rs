//! # Rate Estimation Module
//!
//! Converts peak-to-peak intervals into beats per minute, keeps a short
//! smoothing history and grades confidence in the reported value.
//!
//! ## Flow per pass
//! 1. Fewer than two peaks: nothing changes
//! 2. Interval variance is mapped to `rhythm_quality` in [0, 1]
//! 3. BPM outside `[min_bpm, max_bpm]` is discarded
//! 4. Accepted BPM enters the history; the reported rate is the rounded mean
//!
//! Confidence is derived on demand from history fill, reported rate and
//! rhythm quality. It is never stored.

use crate::config::RateConfig;
use crate::peaks::PeakSet;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;

/// Result of feeding one peak set to the estimator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateOutcome {
    TooFewPeaks { found: usize },
    OutOfRange { bpm: f64 },
    Accepted { bpm: f64, smoothed: u32 },
}

/// Categorical confidence grade, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// No heart rate established yet
    Unknown,
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::Unknown => "unknown",
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(label)
    }
}

pub struct RateEstimator {
    config: RateConfig,
    history: VecDeque<f64>,
    current: Option<u32>,
    rhythm_quality: f64,
}

/// Population variance of `values` around their mean.
fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

impl RateEstimator {
    pub fn new(config: RateConfig) -> Self {
        let history = VecDeque::with_capacity(config.history_len);
        Self {
            config,
            history,
            current: None,
            rhythm_quality: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.current = None;
        self.rhythm_quality = 0.0;
    }

    /// Smoothed heart rate, once at least one estimate has been accepted.
    pub fn current(&self) -> Option<u32> {
        self.current
    }

    pub fn history(&self) -> Vec<f64> {
        self.history.iter().copied().collect()
    }

    pub fn rhythm_quality(&self) -> f64 {
        self.rhythm_quality
    }

    /// Linear map from interval variance to quality between the configured thresholds.
    pub fn quality_from_variance(&self, variance: f64) -> f64 {
        let high = self.config.variance_high_quality;
        let low = self.config.variance_low_quality;

        if variance <= high {
            1.0
        } else if variance >= low {
            0.0
        } else {
            1.0 - (variance - high) / (low - high)
        }
    }

    pub fn update(&mut self, peaks: &PeakSet, sample_rate_hz: f64) -> RateOutcome {
        if peaks.len() < 2 {
            return RateOutcome::TooFewPeaks { found: peaks.len() };
        }

        let intervals: Vec<f64> = peaks.intervals().map(|d| d as f64).collect();
        let mean_interval = intervals.iter().sum::<f64>() / intervals.len() as f64;
        let bpm = 60.0 * sample_rate_hz / mean_interval;

        self.rhythm_quality = self.quality_from_variance(variance(&intervals));

        if bpm < self.config.min_bpm || bpm > self.config.max_bpm {
            log::warn!("Discarding implausible rate of {:.1} BPM", bpm);
            return RateOutcome::OutOfRange { bpm };
        }

        self.history.push_back(bpm);
        while self.history.len() > self.config.history_len {
            self.history.pop_front();
        }

        let mean = self.history.iter().sum::<f64>() / self.history.len() as f64;
        let smoothed = mean.round() as u32;
        self.current = Some(smoothed);

        RateOutcome::Accepted { bpm, smoothed }
    }

    /// Numeric confidence in [0, 1], `None` until a rate is established.
    pub fn confidence_score(&self) -> Option<f64> {
        let rate = self.current?;

        let history_factor =
            (self.history.len() as f64 / self.config.history_len as f64).min(1.0);
        let range_factor =
            if (self.config.confident_min_bpm..=self.config.confident_max_bpm).contains(&rate) {
                1.0
            } else {
                self.config.out_of_range_factor
            };

        Some(history_factor * range_factor * self.rhythm_quality)
    }

    pub fn confidence(&self) -> Confidence {
        match self.confidence_score() {
            None => Confidence::Unknown,
            Some(score) if score > self.config.high_confidence => Confidence::High,
            Some(score) if score > self.config.medium_confidence => Confidence::Medium,
            Some(_) => Confidence::Low,
        }
    }
}
