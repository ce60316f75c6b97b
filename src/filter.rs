//! Two-stage single-pole IIR band limiting.
//!
//! A low-pass stage `y[i] = x[i]·(1-a) + y[i-1]·a` followed by a high-pass
//! stage `h[i] = y[i] - y[i-1] + b·h[i-1]`, with `a = e^(-2π·low/fs)` and
//! `b = e^(-2π·high/fs)`. This is a coarse design, not a linear-phase
//! filter; ringing after transients is expected.

use std::f64::consts::PI;

pub struct BandpassFilter {
    low_alpha: f64,
    high_alpha: f64,
}

/// Single-pole smoothing coefficient for `cutoff_hz` at `sample_rate_hz`.
pub fn pole_coefficient(cutoff_hz: f64, sample_rate_hz: f64) -> f64 {
    (-2.0 * PI * cutoff_hz / sample_rate_hz).exp()
}

impl BandpassFilter {
    pub fn new(sample_rate_hz: f64, low_cutoff_hz: f64, high_cutoff_hz: f64) -> Self {
        Self {
            low_alpha: pole_coefficient(low_cutoff_hz, sample_rate_hz),
            high_alpha: pole_coefficient(high_cutoff_hz, sample_rate_hz),
        }
    }

    pub fn coefficients(&self) -> (f64, f64) {
        (self.low_alpha, self.high_alpha)
    }

    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        let Some(&first) = signal.first() else {
            return Vec::new();
        };

        // Seed the low-pass with the first input so there is no start-up step.
        let mut lowpass = Vec::with_capacity(signal.len());
        lowpass.push(first);
        for &x in &signal[1..] {
            let prev = lowpass[lowpass.len() - 1];
            lowpass.push(x * (1.0 - self.low_alpha) + prev * self.low_alpha);
        }

        let mut highpass = Vec::with_capacity(signal.len());
        highpass.push(0.0);
        for i in 1..lowpass.len() {
            let h = lowpass[i] - lowpass[i - 1] + self.high_alpha * highpass[i - 1];
            highpass.push(h);
        }

        highpass
    }
}
