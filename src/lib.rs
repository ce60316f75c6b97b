//! Camera photoplethysmography (PPG) heart-rate estimation.
//!
//! Feed one averaged red/green/blue [`Sample`] per video frame into a
//! [`SessionController`]. Every frame returns a [`FrameStatus`]; about once
//! a second the buffered green channel is detrended, band limited and
//! searched for beats, and the smoothed heart rate is updated.
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use pulse_sense::{Sample, SessionController};
//!
//! let mut session = SessionController::with_default_config();
//! session.start_measurement();
//!
//! let start = Utc::now();
//! for i in 0..450 {
//!     let t = i as f64 / 30.0;
//!     let green = 128.0 + 8.0 * (2.0 * std::f64::consts::PI * 1.2 * t).sin();
//!     let at = start + Duration::milliseconds((t * 1000.0) as i64);
//!     session.process_frame(Sample::new(100.0, green, 80.0, at));
//! }
//!
//! let summary = session.stop_measurement().unwrap();
//! assert!(summary.heart_rate.is_some());
//! ```

pub mod app;
pub mod config;
pub mod detrend;
pub mod error;
pub mod filter;
pub mod peaks;
pub mod quality;
pub mod rate;
pub mod report;
pub mod session;
pub mod source;
pub mod timeseries;

pub use config::EngineConfig;
pub use error::{ConfigError, SessionError, SourceError};
pub use rate::Confidence;
pub use report::{HeartRateReport, RateCategory};
pub use session::{AnalysisOutcome, FrameStatus, SessionController, SessionStatus, SessionSummary};
pub use timeseries::{Channel, Sample, SampleBuffer, Timestamp};
