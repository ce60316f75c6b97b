//! # Configuration Management Module
//!
//! Tunable constants of the heart-rate engine, stored as TOML in a
//! platform-appropriate location. Every empirical threshold used by the
//! pipeline lives here so it can be overridden per deployment or per test.
//!
//! ## Sections
//! - `sampling`: frame rate, window length, recompute cadence
//! - `quality`: per-frame contact heuristic thresholds
//! - `filter`: detrend window and bandpass cutoffs
//! - `peaks`: dynamic threshold ratio and minimum beat spacing
//! - `rate`: accepted BPM range, smoothing history, confidence grading
//!
//! ## Storage Location
//! - macOS: ~/Library/Application Support/pulse-sense/config.toml
//! - Linux: ~/.config/pulse-sense/config.toml
//! - Windows: %APPDATA%\pulse-sense\config.toml
//!
//! Missing keys fall back to their defaults, so a file only needs to name
//! what it overrides.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Nominal camera frame rate
    pub sample_rate_hz: f64,
    /// Length of the sliding analysis window
    pub buffer_seconds: f64,
    /// History required before the first estimate
    pub min_valid_seconds: f64,
    /// Frames between pipeline passes
    pub recompute_interval_frames: u64,
    /// Derive the rate from sample timestamps instead of `sample_rate_hz`
    pub use_timestamp_rate: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 30.0,
            buffer_seconds: 15.0,
            min_valid_seconds: 5.0,
            recompute_interval_frames: 30,
            use_timestamp_rate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Green level below which the sensor is considered uncovered
    pub min_green: f64,
    /// Margin by which green must dominate red and blue for good contact
    pub channel_margin: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_green: 50.0,
            channel_margin: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub low_cutoff_hz: f64,
    pub high_cutoff_hz: f64,
    /// Half-width of the centered moving average used for detrending
    pub detrend_window_seconds: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_cutoff_hz: 0.5,
            high_cutoff_hz: 4.0,
            detrend_window_seconds: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Fraction of the pass maximum a peak must exceed
    pub threshold_ratio: f64,
    /// Minimum time between accepted peaks
    pub min_distance_seconds: f64,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            threshold_ratio: 0.3,
            min_distance_seconds: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Physiologically plausible range; estimates outside it are discarded
    pub min_bpm: f64,
    pub max_bpm: f64,
    /// Number of accepted estimates averaged into the reported rate
    pub history_len: usize,
    /// Interval variance (samples²) at or below which rhythm quality is 1.0
    pub variance_high_quality: f64,
    /// Interval variance at or above which rhythm quality is 0.0
    pub variance_low_quality: f64,
    /// Range inside which a reported rate keeps full confidence
    pub confident_min_bpm: u32,
    pub confident_max_bpm: u32,
    /// Confidence multiplier for rates outside the confident range
    pub out_of_range_factor: f64,
    pub high_confidence: f64,
    pub medium_confidence: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            min_bpm: 40.0,
            max_bpm: 200.0,
            history_len: 5,
            variance_high_quality: 1.0,
            variance_low_quality: 10.0,
            confident_min_bpm: 40,
            confident_max_bpm: 180,
            out_of_range_factor: 0.5,
            high_confidence: 0.8,
            medium_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sampling: SamplingConfig,
    pub quality: QualityConfig,
    pub filter: FilterConfig,
    pub peaks: PeakConfig,
    pub rate: RateConfig,
}

impl EngineConfig {
    /// Get the path to the default config file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulse-sense")
            .join("config.toml")
    }

    /// Load config from the default location, or create it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path())
    }

    /// Load config from `path`, writing the defaults there if the file is missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(contents) => {
                let config: Self = toml::from_str(&contents).map_err(ConfigError::ParseFailed)?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, writing defaults", path.display());
                let config = Self::default();
                config.save_to(path)?;
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadFailed(e)),
        }
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(Self::config_path())
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::WriteFailed)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(ConfigError::SerializeFailed)?;
        fs::write(path, toml_string).map_err(ConfigError::WriteFailed)?;

        Ok(())
    }

    /// Number of samples held by the sliding window
    pub fn capacity(&self) -> usize {
        (self.sampling.sample_rate_hz * self.sampling.buffer_seconds).round() as usize
    }

    /// Samples required before any estimate is attempted
    pub fn min_valid_samples(&self) -> usize {
        (self.sampling.sample_rate_hz * self.sampling.min_valid_seconds).round() as usize
    }

    /// Minimum peak spacing in samples at sampling rate `fs`
    pub fn min_peak_distance_samples(&self, fs: f64) -> usize {
        (self.peaks.min_distance_seconds * fs).floor() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        let s = &self.sampling;
        if !(s.sample_rate_hz > 0.0) {
            return invalid("sampling.sample_rate_hz must be positive");
        }
        if !(s.buffer_seconds > 0.0) || !(s.min_valid_seconds > 0.0) {
            return invalid("sampling durations must be positive");
        }
        if s.recompute_interval_frames == 0 {
            return invalid("sampling.recompute_interval_frames must be at least 1");
        }
        if self.min_valid_samples() > self.capacity() {
            return invalid("sampling.min_valid_seconds exceeds sampling.buffer_seconds");
        }
        if self.min_valid_samples() < 3 {
            return invalid("sampling.min_valid_seconds must cover at least 3 samples");
        }

        let f = &self.filter;
        if !(f.low_cutoff_hz > 0.0) || f.high_cutoff_hz <= f.low_cutoff_hz {
            return invalid("filter cutoffs must satisfy 0 < low_cutoff_hz < high_cutoff_hz");
        }
        if !(f.detrend_window_seconds > 0.0) {
            return invalid("filter.detrend_window_seconds must be positive");
        }

        let p = &self.peaks;
        if !(0.0..=1.0).contains(&p.threshold_ratio) {
            return invalid("peaks.threshold_ratio must be within [0, 1]");
        }
        if p.min_distance_seconds < 0.0 {
            return invalid("peaks.min_distance_seconds must not be negative");
        }

        let r = &self.rate;
        if !(r.min_bpm > 0.0) || r.max_bpm <= r.min_bpm {
            return invalid("rate bounds must satisfy 0 < min_bpm < max_bpm");
        }
        if r.history_len == 0 {
            return invalid("rate.history_len must be at least 1");
        }
        if r.variance_low_quality <= r.variance_high_quality {
            return invalid("rate.variance_low_quality must exceed rate.variance_high_quality");
        }
        if r.confident_max_bpm < r.confident_min_bpm {
            return invalid("rate.confident_max_bpm is below rate.confident_min_bpm");
        }
        if r.high_confidence < r.medium_confidence {
            return invalid("rate.high_confidence is below rate.medium_confidence");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.capacity(), 450);
        assert_eq!(config.min_valid_samples(), 150);
        assert_eq!(config.min_peak_distance_samples(30.0), 15);
        assert_eq!(config.sampling.recompute_interval_frames, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = EngineConfig::default();
        config.quality.min_green = 42.0;

        let toml_str = toml::to_string(&config).expect("Failed to serialize");
        assert!(toml_str.contains("[quality]"));
        assert!(toml_str.contains("min_green = 42.0"));
    }

    #[test]
    fn test_partial_config_deserialization() {
        let toml_str = r#"
            [peaks]
            threshold_ratio = 0.5

            [rate]
            history_len = 8
        "#;

        let config: EngineConfig = toml::from_str(toml_str).expect("Failed to deserialize");
        assert_eq!(config.peaks.threshold_ratio, 0.5);
        assert_eq!(config.peaks.min_distance_seconds, 0.5);
        assert_eq!(config.rate.history_len, 8);
        assert_eq!(config.sampling, SamplingConfig::default());
    }

    #[test]
    fn test_load_creates_default() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("nested").join("config.toml");

        let config = EngineConfig::load_from(&path).expect("Failed to load config");
        assert_eq!(config, EngineConfig::default());
        assert!(path.exists());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.toml");

        let mut config = EngineConfig::default();
        config.sampling.recompute_interval_frames = 15;
        config.save_to(&path).expect("Failed to save");

        let loaded = EngineConfig::load_from(&path).expect("Failed to load");
        assert_eq!(loaded.sampling.recompute_interval_frames, 15);
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "sampling = [").unwrap();

        assert!(matches!(
            EngineConfig::load_from(&path),
            Err(ConfigError::ParseFailed(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.filter.low_cutoff_hz = 5.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = EngineConfig::default();
        config.sampling.min_valid_seconds = 20.0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.sampling.recompute_interval_frames = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.peaks.threshold_ratio = 1.5;
        assert!(config.validate().is_err());
    }
}
