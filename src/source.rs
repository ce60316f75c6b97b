//! # Sample Source Module
//!
//! Producers that feed color samples to the engine from a dedicated thread.
//! Each runs until its input is exhausted and then sends `Finished`.
//!
//! ## Sources
//! - `SyntheticSource`: PPG-like waveform at a chosen heart rate, with slow
//!   ambient-light drift added to every channel
//! - `LineSource`: text lines of `red,green,blue[,unix_millis]`; blank lines
//!   and `#` comments are skipped. Without a timestamp the arrival time is used.

use crate::error::SourceError;
use crate::timeseries::{Sample, Timestamp};
use chrono::{DateTime, Duration, Utc};
use crossbeam_channel::Sender;
use std::f64::consts::PI;
use std::io::BufRead;

/// Message sent from a source thread to the consumer
#[derive(Debug)]
pub enum SourceUpdate {
    Sample(Sample),
    Finished,
    Error(SourceError),
}

/// Generates a fingertip-over-lens signal: green pulses and dominates
/// red and blue, all three drifting together.
pub struct SyntheticSource {
    pub heart_rate_bpm: f64,
    pub sample_rate_hz: f64,
    pub seconds: f64,
    pub pulse_amplitude: f64,
    pub drift_amplitude: f64,
    /// Sleep between frames to mimic a live camera
    pub realtime: bool,
    pub start: Timestamp,
}

// Ambient light change, much slower than any heartbeat
const DRIFT_HZ: f64 = 0.05;

impl SyntheticSource {
    pub fn new(heart_rate_bpm: f64, sample_rate_hz: f64, seconds: f64) -> Self {
        Self {
            heart_rate_bpm,
            sample_rate_hz,
            seconds,
            pulse_amplitude: 8.0,
            drift_amplitude: 6.0,
            realtime: false,
            start: Utc::now(),
        }
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn frame_count(&self) -> u64 {
        (self.seconds * self.sample_rate_hz).round().max(0.0) as u64
    }

    pub fn sample_at(&self, index: u64) -> Sample {
        let t = index as f64 / self.sample_rate_hz;
        let drift = self.drift_amplitude * (2.0 * PI * DRIFT_HZ * t).sin();
        let pulse = self.pulse_amplitude * (2.0 * PI * self.heart_rate_bpm / 60.0 * t).sin();

        Sample::new(
            95.0 + drift,
            128.0 + pulse + drift,
            70.0 + drift,
            self.start + Duration::microseconds((t * 1_000_000.0).round() as i64),
        )
    }

    pub fn run(self, sender: Sender<SourceUpdate>) {
        let frame_interval = std::time::Duration::from_secs_f64(1.0 / self.sample_rate_hz);

        for index in 0..self.frame_count() {
            if sender.send(SourceUpdate::Sample(self.sample_at(index))).is_err() {
                log::debug!("Sample receiver dropped, stopping synthetic source");
                return;
            }
            if self.realtime {
                std::thread::sleep(frame_interval);
            }
        }

        let _ = sender.send(SourceUpdate::Finished);
    }
}

/// Parses one input line. `Ok(None)` for blank and comment lines.
pub fn parse_line(
    line: &str,
    line_no: usize,
    received_at: Timestamp,
) -> Result<Option<Sample>, SourceError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let malformed = |reason: String| SourceError::ParseFailed {
        line: line_no,
        reason,
    };

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 3 && fields.len() != 4 {
        return Err(malformed(format!(
            "expected 3 or 4 fields, found {}",
            fields.len()
        )));
    }

    let mut channels = [0.0; 3];
    for (value, field) in channels.iter_mut().zip(&fields) {
        *value = field
            .parse::<f64>()
            .map_err(|e| malformed(format!("bad channel value {:?}: {}", field, e)))?;
    }

    let captured_at = match fields.get(3) {
        Some(field) => {
            let millis = field
                .parse::<i64>()
                .map_err(|e| malformed(format!("bad timestamp {:?}: {}", field, e)))?;
            DateTime::<Utc>::from_timestamp_millis(millis)
                .ok_or_else(|| malformed(format!("timestamp {} out of range", millis)))?
        }
        None => received_at,
    };

    Ok(Some(Sample::new(
        channels[0],
        channels[1],
        channels[2],
        captured_at,
    )))
}

pub struct LineSource<R> {
    reader: R,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn run(self, sender: Sender<SourceUpdate>) {
        for (idx, line) in self.reader.lines().enumerate() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    let _ = sender.send(SourceUpdate::Error(SourceError::ReadFailed(e)));
                    return;
                }
            };

            match parse_line(&line, idx + 1, Utc::now()) {
                Ok(Some(sample)) => {
                    if sender.send(SourceUpdate::Sample(sample)).is_err() {
                        return;
                    }
                }
                Ok(None) => {}
                Err(e) => log::warn!("{}, skipping", e),
            }
        }

        let _ = sender.send(SourceUpdate::Finished);
    }
}
