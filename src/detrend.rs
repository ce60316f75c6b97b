//! Baseline drift removal.
//!
//! Subtracts a centered moving average from every sample. Near either end
//! of the signal the window shrinks to what is available instead of being
//! padded, so no synthetic trend is introduced at the boundaries.

pub struct Detrender {
    half_window: usize,
}

impl Detrender {
    /// `half_window` samples are averaged on each side of the current one.
    pub fn new(half_window: usize) -> Self {
        Self { half_window }
    }

    /// Detrender whose half window spans `window_seconds` at `sample_rate_hz`.
    pub fn for_rate(sample_rate_hz: f64, window_seconds: f64) -> Self {
        Self::new((sample_rate_hz * window_seconds).round().max(1.0) as usize)
    }

    pub fn half_window(&self) -> usize {
        self.half_window
    }

    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        // prefix[k] = sum of signal[..k]
        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0.0);
        let mut acc = 0.0;
        for &x in signal {
            acc += x;
            prefix.push(acc);
        }

        (0..n)
            .map(|i| {
                let lo = i.saturating_sub(self.half_window);
                let hi = (i + self.half_window).min(n - 1);
                let mean = (prefix[hi + 1] - prefix[lo]) / (hi + 1 - lo) as f64;
                signal[i] - mean
            })
            .collect()
    }
}
