//! # Peak Detection Module
//!
//! Finds beat-consistent local maxima in the band-limited signal.
//!
//! ## Rules
//! 1. A candidate is a strict local maximum: `s[i] > s[i-1] && s[i] > s[i+1]`
//! 2. It must exceed `threshold_ratio × max(s)`, recomputed on every pass
//! 3. Accepted peaks are at least `min_distance` samples apart. A candidate
//!    closer than that to the last accepted peak replaces it when taller and
//!    is dropped otherwise.
//!
//! ## Known Limitation
//! Each pass starts from scratch over the sliding window. Two close peaks of
//! near-equal height may therefore win alternately on consecutive passes as
//! the window shifts. The replacement rule is kept as is.

/// Buffer-relative indices of detected beats, strictly increasing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeakSet {
    indices: Vec<usize>,
}

impl PeakSet {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    /// Sample counts between consecutive peaks.
    pub fn intervals(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.windows(2).map(|w| w[1] - w[0])
    }
}

impl From<Vec<usize>> for PeakSet {
    /// Builds a set from indices that are already sorted and spaced.
    fn from(indices: Vec<usize>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        Self { indices }
    }
}

pub struct PeakDetector {
    threshold_ratio: f64,
    min_distance: usize,
}

impl PeakDetector {
    pub fn new(threshold_ratio: f64, min_distance: usize) -> Self {
        Self {
            threshold_ratio,
            min_distance,
        }
    }

    pub fn min_distance(&self) -> usize {
        self.min_distance
    }

    pub fn detect(&self, signal: &[f64]) -> PeakSet {
        if signal.len() < 3 {
            return PeakSet::default();
        }

        let max = signal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let threshold = self.threshold_ratio * max;

        let mut indices: Vec<usize> = Vec::new();
        for i in 1..signal.len() - 1 {
            let value = signal[i];
            if !(value > signal[i - 1] && value > signal[i + 1] && value > threshold) {
                continue;
            }

            match indices.last().copied() {
                Some(last) if i - last < self.min_distance => {
                    if value > signal[last] {
                        let end = indices.len() - 1;
                        indices[end] = i;
                    }
                }
                _ => indices.push(i),
            }
        }

        PeakSet { indices }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_short_signal_has_no_peaks() {
        let detector = PeakDetector::new(0.3, 15);
        assert!(detector.detect(&[]).is_empty());
        assert!(detector.detect(&[0.0, 1.0]).is_empty());
    }

    #[test]
    fn test_sinusoid_peaks_one_per_period() {
        // 1.2 Hz at 30 Hz sampling: one period every 25 samples
        let signal: Vec<f64> = (0..300)
            .map(|i| (2.0 * PI * 1.2 * i as f64 / 30.0 + 0.3).sin())
            .collect();
        let peaks = PeakDetector::new(0.3, 15).detect(&signal);

        assert_eq!(peaks.len(), 12);
        assert!(peaks.intervals().all(|d| d == 25));
    }

    #[test]
    fn test_low_amplitude_candidates_rejected() {
        let mut signal = vec![0.0; 60];
        signal[10] = 10.0;
        signal[30] = 2.0; // below 0.3 × 10
        signal[50] = 4.0;

        let peaks = PeakDetector::new(0.3, 5).detect(&signal);
        assert_eq!(peaks.as_slice(), &[10, 50]);
    }

    #[test]
    fn test_close_taller_peak_replaces_previous() {
        let mut signal = vec![0.0; 40];
        signal[10] = 5.0;
        signal[14] = 8.0;
        signal[30] = 6.0;

        let peaks = PeakDetector::new(0.3, 15).detect(&signal);
        assert_eq!(peaks.as_slice(), &[14, 30]);
    }

    #[test]
    fn test_close_shorter_peak_discarded() {
        let mut signal = vec![0.0; 40];
        signal[10] = 8.0;
        signal[14] = 5.0;
        signal[30] = 6.0;

        let peaks = PeakDetector::new(0.3, 15).detect(&signal);
        assert_eq!(peaks.as_slice(), &[10, 30]);
    }

    #[test]
    fn test_spacing_invariant_holds() {
        let signal: Vec<f64> = (0..400)
            .map(|i| {
                let t = i as f64 / 30.0;
                (2.0 * PI * 1.5 * t).sin() + 0.6 * (2.0 * PI * 4.7 * t).sin()
            })
            .collect();
        let peaks = PeakDetector::new(0.3, 15).detect(&signal);

        assert!(peaks.len() >= 2);
        assert!(peaks.intervals().all(|d| d >= 15));
    }

    #[test]
    fn test_plateau_is_not_a_peak() {
        let peaks = PeakDetector::new(0.3, 1).detect(&[0.0, 1.0, 1.0, 0.0]);
        assert!(peaks.is_empty());
    }
}
