//! # Sample Window Module
//!
//! Time-stamped color samples and the fixed-capacity sliding window that
//! every analysis stage reads from.
//!
//! ## Key Types
//! - `Sample`: one video frame's averaged red/green/blue intensities
//! - `Channel`: selects a single color channel
//! - `SampleBuffer`: FIFO window holding the most recent samples
//!
//! ## Invariants
//! - `len() <= capacity()` at all times; the oldest sample is evicted first
//! - timestamps are non-decreasing from front to back

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Wall-clock capture time of a frame.
pub type Timestamp = DateTime<Utc>;

/// Averaged color intensities of one camera frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub captured_at: Timestamp,
}

impl Sample {
    pub fn new(red: f64, green: f64, blue: f64, captured_at: Timestamp) -> Self {
        Self {
            red,
            green,
            blue,
            captured_at,
        }
    }

    pub fn channel(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Red => self.red,
            Channel::Green => self.green,
            Channel::Blue => self.blue,
        }
    }
}

/// Color channel identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }
}

/// Seconds elapsed from `from` to `to`, with microsecond resolution.
pub(crate) fn seconds_between(from: Timestamp, to: Timestamp) -> f64 {
    (to - from)
        .num_microseconds()
        .map(|us| us as f64 / 1_000_000.0)
        .unwrap_or(0.0)
}

/// Sliding window over the most recent samples.
pub struct SampleBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl SampleBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Buffer sized to hold `duration_s` seconds of data at `sample_rate_hz`.
    pub fn with_duration(sample_rate_hz: f64, duration_s: f64) -> Self {
        Self::new((sample_rate_hz * duration_s).round() as usize)
    }

    /// Appends a sample, returning the evicted oldest sample once full.
    ///
    /// A sample stamped earlier than the current tail is re-stamped with the
    /// tail's time so the window stays chronologically ordered.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let sample = match self.samples.back() {
            Some(last) if sample.captured_at < last.captured_at => {
                log::warn!(
                    "Out-of-order sample at {} (tail {}), clamping timestamp",
                    sample.captured_at,
                    last.captured_at
                );
                Sample {
                    captured_at: last.captured_at,
                    ..sample
                }
            }
            _ => sample,
        };

        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn first(&self) -> Option<&Sample> {
        self.samples.front()
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter()
    }

    /// Snapshot of one channel in chronological order.
    pub fn channel_history(&self, channel: Channel) -> Vec<f64> {
        self.samples.iter().map(|s| s.channel(channel)).collect()
    }

    /// Time covered by the window, first to last sample.
    pub fn span_seconds(&self) -> f64 {
        match (self.first(), self.last()) {
            (Some(first), Some(last)) => seconds_between(first.captured_at, last.captured_at),
            _ => 0.0,
        }
    }

    /// Sampling rate measured from the window's timestamps.
    ///
    /// `None` with fewer than two samples or when all samples share a timestamp.
    pub fn measured_rate_hz(&self) -> Option<f64> {
        let span = self.span_seconds();
        if self.samples.len() < 2 || span <= 0.0 {
            return None;
        }
        Some((self.samples.len() - 1) as f64 / span)
    }
}
