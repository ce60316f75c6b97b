//! # Heart Rate Report Module
//!
//! Turns the session's final reading into a coarse, clinical-style bucket
//! with advisory text for display.
//!
//! | Category    | Range (BPM) |
//! |-------------|-------------|
//! | Bradycardia | < 60        |
//! | Normal      | 60 – 100    |
//! | Elevated    | 101 – 120   |
//! | Tachycardia | > 120       |
//!
//! These buckets are screening hints, not a diagnosis.

use crate::rate::Confidence;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateCategory {
    Bradycardia,
    Normal,
    Elevated,
    Tachycardia,
}

impl RateCategory {
    pub fn classify(bpm: u32) -> Self {
        match bpm {
            0..=59 => RateCategory::Bradycardia,
            60..=100 => RateCategory::Normal,
            101..=120 => RateCategory::Elevated,
            _ => RateCategory::Tachycardia,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RateCategory::Bradycardia => "Bradycardia",
            RateCategory::Normal => "Normal",
            RateCategory::Elevated => "Elevated",
            RateCategory::Tachycardia => "Tachycardia",
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            RateCategory::Bradycardia => {
                "Resting heart rate is below 60 BPM. This is common in trained athletes; \
                 consult a clinician if you also feel dizzy, faint or unusually tired."
            }
            RateCategory::Normal => "Resting heart rate is within the typical 60-100 BPM range.",
            RateCategory::Elevated => {
                "Heart rate is slightly above the typical resting range. \
                 Sit quietly for a few minutes and measure again."
            }
            RateCategory::Tachycardia => {
                "Resting heart rate is above 120 BPM. If it stays this high at rest, \
                 or comes with chest pain or shortness of breath, seek medical advice."
            }
        }
    }
}

impl fmt::Display for RateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

const INSUFFICIENT_DATA_ADVICE: &str =
    "Not enough clean signal to estimate a heart rate. Cover the camera and flash \
     completely with a fingertip, hold still and measure for at least 15 seconds.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Complete,
    InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartRateReport {
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<RateCategory>,
    pub confidence: Confidence,
    pub title: String,
    pub advice: String,
}

impl HeartRateReport {
    pub fn new(heart_rate: Option<u32>, confidence: Confidence) -> Self {
        match heart_rate {
            Some(bpm) => {
                let category = RateCategory::classify(bpm);
                Self {
                    status: ReportStatus::Complete,
                    heart_rate: Some(bpm),
                    category: Some(category),
                    confidence,
                    title: format!("{} ({} BPM)", category, bpm),
                    advice: category.advice().to_string(),
                }
            }
            None => Self {
                status: ReportStatus::InsufficientData,
                heart_rate: None,
                category: None,
                confidence: Confidence::Unknown,
                title: "Insufficient data".to_string(),
                advice: INSUFFICIENT_DATA_ADVICE.to_string(),
            },
        }
    }
}
