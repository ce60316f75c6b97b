//! # Measurement Session Module
//!
//! Orchestrates one heart-rate measurement from start to stop.
//!
//! ## Lifecycle
//! ```text
//! Idle ──start──▶ Measuring ──stop──▶ Stopped
//!                    ▲                   │
//!                    └──────start────────┘
//! ```
//! `start_measurement` from any phase discards all previous state.
//!
//! ## Per frame
//! 1. Push the sample into the sliding window
//! 2. Score sensor contact (cheap, every frame)
//! 3. When the cadence is due and enough history exists, run
//!    detrend → bandpass → peaks → rate over the green channel
//!
//! Every call returns a `FrameStatus`; noisy input never aborts a session.

use crate::config::EngineConfig;
use crate::detrend::Detrender;
use crate::error::{ConfigError, SessionError};
use crate::filter::BandpassFilter;
use crate::peaks::PeakDetector;
use crate::quality::SignalQualityAssessor;
use crate::rate::{Confidence, RateEstimator, RateOutcome};
use crate::report::HeartRateReport;
use crate::timeseries::{seconds_between, Channel, Sample, SampleBuffer, Timestamp};
use serde::Serialize;

/// Channel the pulse is extracted from
const PULSE_CHANNEL: Channel = Channel::Green;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Measuring,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Measuring,
    NotMeasuring,
    Stopped,
}

/// What happened to the heavy pipeline on a given frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Not due this frame, or no session running
    Deferred,
    /// Due, but the window is still too short
    InsufficientData { available: usize, required: usize },
    /// Fewer than two beats found; the previous rate is kept
    NoPeaksFound { peaks: usize },
    /// Estimate discarded as implausible
    OutOfPhysiologicalRange { bpm: f64 },
    Updated { bpm: f64, heart_rate: u32 },
}

/// Record returned for every processed frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameStatus {
    pub status: SessionStatus,
    pub frame: u64,
    pub signal_quality: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    pub analysis: AnalysisOutcome,
}

/// Record returned when a session is stopped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub status: SessionStatus,
    pub duration_seconds: f64,
    pub frames_processed: u64,
    pub frame_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    pub confidence: Confidence,
}

/// Fixed-interval recompute throttle.
#[derive(Debug, Clone, Copy)]
pub struct RecomputeCadence {
    interval_frames: u64,
}

impl RecomputeCadence {
    pub fn every(interval_frames: u64) -> Self {
        Self { interval_frames }
    }

    pub fn is_due(&self, frame: u64, last_processed: u64) -> bool {
        frame.saturating_sub(last_processed) >= self.interval_frames
    }
}

/// Mutable per-session bookkeeping
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub frame_counter: u64,
    pub last_processed_frame: u64,
    /// Capture time of the session's first frame
    pub started_at: Option<Timestamp>,
    pub last_frame_at: Option<Timestamp>,
    /// Contact score of the latest frame
    pub signal_quality: f64,
}

pub struct SessionController {
    config: EngineConfig,
    state: SessionState,
    buffer: SampleBuffer,
    assessor: SignalQualityAssessor,
    estimator: RateEstimator,
    cadence: RecomputeCadence,
}

impl SessionController {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    pub fn with_default_config() -> Self {
        Self::build(EngineConfig::default())
    }

    fn build(config: EngineConfig) -> Self {
        Self {
            state: SessionState::default(),
            buffer: SampleBuffer::new(config.capacity()),
            assessor: SignalQualityAssessor::new(config.quality.clone()),
            estimator: RateEstimator::new(config.rate.clone()),
            cadence: RecomputeCadence::every(config.sampling.recompute_interval_frames),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn frame_counter(&self) -> u64 {
        self.state.frame_counter
    }

    pub fn last_processed_frame(&self) -> u64 {
        self.state.last_processed_frame
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn current_heart_rate(&self) -> Option<u32> {
        self.estimator.current()
    }

    pub fn heart_rate_history(&self) -> Vec<f64> {
        self.estimator.history()
    }

    pub fn confidence(&self) -> Confidence {
        self.estimator.confidence()
    }

    /// Begins a fresh session, discarding everything from the previous one.
    pub fn start_measurement(&mut self) {
        if self.state.phase == SessionPhase::Measuring {
            log::info!(
                "Restarting measurement after {} frames",
                self.state.frame_counter
            );
        }

        self.state = SessionState {
            phase: SessionPhase::Measuring,
            ..SessionState::default()
        };
        self.buffer.clear();
        self.estimator.reset();

        log::info!(
            "Measurement started ({} Hz, {} sample window)",
            self.config.sampling.sample_rate_hz,
            self.buffer.capacity()
        );
    }

    pub fn process_frame(&mut self, sample: Sample) -> FrameStatus {
        if self.state.phase != SessionPhase::Measuring {
            return self.frame_status(SessionStatus::NotMeasuring, AnalysisOutcome::Deferred);
        }

        self.state.frame_counter += 1;
        self.buffer.push(sample);

        let captured_at = self.buffer.last().map(|s| s.captured_at);
        if self.state.started_at.is_none() {
            self.state.started_at = captured_at;
        }
        self.state.last_frame_at = captured_at;
        self.state.signal_quality = self.assessor.score(&sample);

        let frame = self.state.frame_counter;
        let required = self.config.min_valid_samples();

        let analysis = if !self.cadence.is_due(frame, self.state.last_processed_frame) {
            AnalysisOutcome::Deferred
        } else if self.buffer.len() < required {
            AnalysisOutcome::InsufficientData {
                available: self.buffer.len(),
                required,
            }
        } else {
            let outcome = self.run_pipeline();
            self.state.last_processed_frame = frame;
            outcome
        };

        let status = self.frame_status(SessionStatus::Measuring, analysis);
        log::trace!("{:?}", status);
        status
    }

    pub fn stop_measurement(&mut self) -> Result<SessionSummary, SessionError> {
        match self.state.phase {
            SessionPhase::Idle => Err(SessionError::NotStarted),
            SessionPhase::Stopped => Err(SessionError::AlreadyStopped),
            SessionPhase::Measuring => {
                self.state.phase = SessionPhase::Stopped;
                let summary = self.summary();
                log::info!(
                    "Measurement stopped: {} frames over {:.1}s ({:.1} fps), heart rate {:?}, confidence {}",
                    summary.frames_processed,
                    summary.duration_seconds,
                    summary.frame_rate,
                    summary.heart_rate,
                    summary.confidence
                );
                Ok(summary)
            }
        }
    }

    pub fn generate_report(&self) -> HeartRateReport {
        HeartRateReport::new(self.estimator.current(), self.estimator.confidence())
    }

    fn summary(&self) -> SessionSummary {
        let duration_seconds = match (self.state.started_at, self.state.last_frame_at) {
            (Some(start), Some(end)) => seconds_between(start, end),
            _ => 0.0,
        };
        let frame_rate = if duration_seconds > 0.0 {
            self.state.frame_counter as f64 / duration_seconds
        } else {
            0.0
        };

        SessionSummary {
            status: SessionStatus::Stopped,
            duration_seconds,
            frames_processed: self.state.frame_counter,
            frame_rate,
            heart_rate: self.estimator.current(),
            confidence: self.estimator.confidence(),
        }
    }

    fn frame_status(&self, status: SessionStatus, analysis: AnalysisOutcome) -> FrameStatus {
        FrameStatus {
            status,
            frame: self.state.frame_counter,
            signal_quality: self.state.signal_quality,
            heart_rate: self.estimator.current(),
            analysis,
        }
    }

    /// Sampling rate used for a pipeline pass.
    fn analysis_rate(&self) -> f64 {
        let nominal = self.config.sampling.sample_rate_hz;
        if self.config.sampling.use_timestamp_rate {
            self.buffer.measured_rate_hz().unwrap_or(nominal)
        } else {
            nominal
        }
    }

    fn run_pipeline(&mut self) -> AnalysisOutcome {
        let fs = self.analysis_rate();
        let filter_config = &self.config.filter;

        let raw = self.buffer.channel_history(PULSE_CHANNEL);
        let detrended = Detrender::for_rate(fs, filter_config.detrend_window_seconds).apply(&raw);
        let filtered = BandpassFilter::new(fs, filter_config.low_cutoff_hz, filter_config.high_cutoff_hz)
            .apply(&detrended);
        let peaks = PeakDetector::new(
            self.config.peaks.threshold_ratio,
            self.config.min_peak_distance_samples(fs),
        )
        .detect(&filtered);

        let had_rate = self.estimator.current().is_some();

        match self.estimator.update(&peaks, fs) {
            RateOutcome::TooFewPeaks { found } => {
                log::debug!(
                    "Frame {}: {} peak(s) in {} {} samples, keeping previous rate",
                    self.state.frame_counter,
                    found,
                    raw.len(),
                    PULSE_CHANNEL.name()
                );
                AnalysisOutcome::NoPeaksFound { peaks: found }
            }
            RateOutcome::OutOfRange { bpm } => AnalysisOutcome::OutOfPhysiologicalRange { bpm },
            RateOutcome::Accepted { bpm, smoothed } => {
                if !had_rate {
                    log::info!("Heart rate established: {} BPM", smoothed);
                }
                log::debug!(
                    "Frame {}: {} peaks, raw {:.1} BPM, smoothed {} BPM, rhythm quality {:.2}",
                    self.state.frame_counter,
                    peaks.len(),
                    bpm,
                    smoothed,
                    self.estimator.rhythm_quality()
                );
                AnalysisOutcome::Updated {
                    bpm,
                    heart_rate: smoothed,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ReportStatus;
    use chrono::{Duration, TimeZone, Utc};
    use std::f64::consts::PI;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn at(i: u64, fs: f64) -> Timestamp {
        t0() + Duration::microseconds((i as f64 * 1_000_000.0 / fs).round() as i64)
    }

    /// Fingertip-like frame: green pulses around 128 and dominates the other channels.
    fn pulse_frame(i: u64, fs: f64, bpm: f64) -> Sample {
        let t = i as f64 / fs;
        let green = 128.0 + 8.0 * (2.0 * PI * bpm / 60.0 * t).sin();
        Sample::new(100.0, green, 80.0, at(i, fs))
    }

    fn flat_frame(i: u64, fs: f64, green: f64) -> Sample {
        Sample::new(5.0, green, 5.0, at(i, fs))
    }

    #[test]
    fn test_sinusoid_recovery() {
        let mut session = SessionController::with_default_config();
        session.start_measurement();

        let mut updates = 0;
        for i in 0..450 {
            let status = session.process_frame(pulse_frame(i, 30.0, 72.0));
            assert_eq!(status.status, SessionStatus::Measuring);
            assert_eq!(status.signal_quality, 0.9);
            if let AnalysisOutcome::Updated { heart_rate, .. } = status.analysis {
                assert!((67..=77).contains(&heart_rate), "pass gave {}", heart_rate);
                updates += 1;
            }
        }

        let rate = session.current_heart_rate().expect("no heart rate");
        assert!((67..=77).contains(&rate), "converged to {}", rate);
        assert!(updates >= 5);
        assert_ne!(session.confidence(), Confidence::Unknown);

        let report = session.generate_report();
        assert_eq!(report.status, ReportStatus::Complete);
    }

    #[test]
    fn test_low_quality_session_reports_nothing() {
        let mut session = SessionController::with_default_config();
        session.start_measurement();

        for i in 0..100 {
            let status = session.process_frame(flat_frame(i, 30.0, 10.0));
            assert_eq!(status.signal_quality, 0.1);
            assert_eq!(status.heart_rate, None);
        }

        let summary = session.stop_measurement().expect("session was running");
        assert_eq!(summary.status, SessionStatus::Stopped);
        assert_eq!(summary.frames_processed, 100);
        assert_eq!(summary.heart_rate, None);
        assert_eq!(summary.confidence, Confidence::Unknown);
        assert_eq!(
            session.generate_report().status,
            ReportStatus::InsufficientData
        );
    }

    #[test]
    fn test_flat_signal_finds_no_peaks() {
        let mut session = SessionController::with_default_config();
        session.start_measurement();

        let mut outcomes = Vec::new();
        for i in 0..300 {
            let status = session.process_frame(flat_frame(i, 30.0, 10.0));
            if status.analysis != AnalysisOutcome::Deferred {
                outcomes.push(status.analysis);
            }
        }

        assert!(outcomes.contains(&AnalysisOutcome::NoPeaksFound { peaks: 0 }));
        assert_eq!(session.current_heart_rate(), None);
    }

    #[test]
    fn test_cadence_waits_for_enough_history() {
        let mut session = SessionController::with_default_config();
        session.start_measurement();

        for i in 0..30 {
            let status = session.process_frame(pulse_frame(i, 30.0, 72.0));
            assert_eq!(session.last_processed_frame(), 0);
            if i < 29 {
                assert_eq!(status.analysis, AnalysisOutcome::Deferred);
            } else {
                assert_eq!(
                    status.analysis,
                    AnalysisOutcome::InsufficientData {
                        available: 30,
                        required: 150
                    }
                );
            }
        }
    }

    #[test]
    fn test_cadence_runs_every_interval() {
        let mut session = SessionController::with_default_config();
        session.start_measurement();

        let mut passes = Vec::new();
        for i in 0..240 {
            let before = session.last_processed_frame();
            session.process_frame(pulse_frame(i, 30.0, 72.0));
            if session.last_processed_frame() != before {
                passes.push(session.frame_counter());
            }
        }

        assert_eq!(passes, vec![150, 180, 210, 240]);
    }

    #[test]
    fn test_stale_rate_kept_when_peaks_vanish() {
        let mut session = SessionController::with_default_config();
        session.start_measurement();

        let mut i = 0;
        while i < 450 {
            session.process_frame(pulse_frame(i, 30.0, 72.0));
            i += 1;
        }
        // wash the pulse out of the window entirely
        while i < 900 {
            session.process_frame(flat_frame(i, 30.0, 128.0));
            i += 1;
        }
        let established = session.current_heart_rate();
        assert!(established.is_some());

        let mut saw_no_peaks = false;
        while i < 960 {
            let status = session.process_frame(flat_frame(i, 30.0, 128.0));
            if let AnalysisOutcome::NoPeaksFound { .. } = status.analysis {
                saw_no_peaks = true;
            }
            assert_eq!(status.heart_rate, established);
            i += 1;
        }
        assert!(saw_no_peaks);
    }

    #[test]
    fn test_frames_ignored_outside_measuring() {
        let mut session = SessionController::with_default_config();

        let status = session.process_frame(pulse_frame(0, 30.0, 72.0));
        assert_eq!(status.status, SessionStatus::NotMeasuring);
        assert_eq!(status.frame, 0);
        assert_eq!(session.buffer_len(), 0);

        session.start_measurement();
        session.process_frame(pulse_frame(0, 30.0, 72.0));
        session.stop_measurement().unwrap();

        let status = session.process_frame(pulse_frame(1, 30.0, 72.0));
        assert_eq!(status.status, SessionStatus::NotMeasuring);
        assert_eq!(status.frame, 1);
        assert_eq!(session.buffer_len(), 1);
    }

    #[test]
    fn test_stop_misuse_is_reported() {
        let mut session = SessionController::with_default_config();
        assert_eq!(session.stop_measurement(), Err(SessionError::NotStarted));
        assert_eq!(session.phase(), SessionPhase::Idle);

        session.start_measurement();
        assert!(session.stop_measurement().is_ok());
        assert_eq!(session.stop_measurement(), Err(SessionError::AlreadyStopped));
        assert_eq!(session.phase(), SessionPhase::Stopped);
    }

    #[test]
    fn test_restart_resets_everything() {
        let mut session = SessionController::with_default_config();
        session.start_measurement();
        for i in 0..300 {
            session.process_frame(pulse_frame(i, 30.0, 72.0));
        }
        assert!(session.current_heart_rate().is_some());

        session.start_measurement();
        assert_eq!(session.phase(), SessionPhase::Measuring);
        assert_eq!(session.frame_counter(), 0);
        assert_eq!(session.last_processed_frame(), 0);
        assert_eq!(session.buffer_len(), 0);
        assert_eq!(session.current_heart_rate(), None);
        assert!(session.heart_rate_history().is_empty());
        assert!(session.state().started_at.is_none());
    }

    #[test]
    fn test_summary_timing_uses_sample_clock() {
        let mut session = SessionController::with_default_config();
        session.start_measurement();
        for i in 0..300 {
            session.process_frame(pulse_frame(i, 30.0, 72.0));
        }

        let summary = session.stop_measurement().unwrap();
        assert_eq!(summary.frames_processed, 300);
        assert!((summary.duration_seconds - 299.0 / 30.0).abs() < 1e-3);
        assert!((summary.frame_rate - 300.0 / (299.0 / 30.0)).abs() < 0.01);
    }

    #[test]
    fn test_buffer_never_exceeds_capacity() {
        let mut session = SessionController::with_default_config();
        session.start_measurement();
        for i in 0..500 {
            session.process_frame(pulse_frame(i, 30.0, 72.0));
        }
        assert_eq!(session.buffer_len(), 450);
        assert_eq!(session.frame_counter(), 500);
    }

    #[test]
    fn test_timestamp_rate_tracks_real_frame_rate() {
        let mut config = EngineConfig::default();
        config.sampling.use_timestamp_rate = true;
        let mut session = SessionController::new(config).unwrap();
        session.start_measurement();

        // camera actually delivers 25 fps
        for i in 0..450 {
            session.process_frame(pulse_frame(i, 25.0, 72.0));
        }

        let rate = session.current_heart_rate().expect("no heart rate");
        assert!((67..=77).contains(&rate), "converged to {}", rate);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.rate.history_len = 0;
        assert!(SessionController::new(config).is_err());
    }

    #[test]
    fn test_cadence_policy() {
        let cadence = RecomputeCadence::every(30);
        assert!(!cadence.is_due(29, 0));
        assert!(cadence.is_due(30, 0));
        assert!(!cadence.is_due(59, 30));
        assert!(cadence.is_due(75, 30));
    }
}
