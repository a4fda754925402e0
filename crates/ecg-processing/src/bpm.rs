//! Heart-rate estimation from accepted peak positions

use ecg_core::{median, HeartRate};
use serde::{Deserialize, Serialize};

/// Shortest plausible beat-to-beat interval, seconds (200 BPM)
pub const DEFAULT_MIN_INTERVAL_SECS: f32 = 0.3;
/// Longest plausible beat-to-beat interval, seconds (30 BPM)
pub const DEFAULT_MAX_INTERVAL_SECS: f32 = 2.0;

/// Median-interval BPM estimator with outlier rejection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BpmEstimator {
    pub min_interval_secs: f32,
    pub max_interval_secs: f32,
}

impl Default for BpmEstimator {
    fn default() -> Self {
        Self {
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
            max_interval_secs: DEFAULT_MAX_INTERVAL_SECS,
        }
    }
}

impl BpmEstimator {
    pub fn new(min_interval_secs: f32, max_interval_secs: f32) -> Self {
        Self {
            min_interval_secs,
            max_interval_secs,
        }
    }

    /// Consecutive peak intervals in seconds that fall inside the plausible band
    pub fn plausible_intervals(&self, peak_indices: &[usize], sampling_rate_hz: u32) -> Vec<f32> {
        if sampling_rate_hz == 0 {
            return Vec::new();
        }

        peak_indices
            .windows(2)
            .map(|pair| pair[1].saturating_sub(pair[0]) as f32 / sampling_rate_hz as f32)
            .filter(|interval| (self.min_interval_secs..=self.max_interval_secs).contains(interval))
            .collect()
    }

    /// BPM from the median plausible interval, rounded to one decimal.
    ///
    /// `None` when fewer than two peaks are given, when no interval survives
    /// the plausibility band, or when the rate falls outside 30..=220 BPM.
    pub fn estimate(&self, peak_indices: &[usize], sampling_rate_hz: u32) -> Option<HeartRate> {
        if peak_indices.len() < 2 {
            return None;
        }

        let intervals = self.plausible_intervals(peak_indices, sampling_rate_hz);
        let median_interval = median(&intervals)?;
        if median_interval <= 0.0 {
            return None;
        }

        let bpm = (60.0 / median_interval * 10.0).round() / 10.0;
        HeartRate::new(bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_half_second_spacing() {
        let estimator = BpmEstimator::default();
        let hr = estimator.estimate(&[0, 100, 200, 300], 200).unwrap();
        assert_eq!(hr.bpm(), 120.0);
    }

    #[test]
    fn test_too_few_peaks() {
        let estimator = BpmEstimator::default();
        assert_eq!(estimator.estimate(&[], 200), None);
        assert_eq!(estimator.estimate(&[42], 200), None);
    }

    #[test]
    fn test_all_intervals_implausible() {
        let estimator = BpmEstimator::default();
        // 0.1 s spacing (600 BPM)
        assert_eq!(estimator.estimate(&[0, 20, 40, 60], 200), None);
        // 3 s spacing (20 BPM)
        assert_eq!(estimator.estimate(&[0, 600, 1200], 200), None);
    }

    #[test]
    fn test_outlier_intervals_are_ignored() {
        let estimator = BpmEstimator::default();
        // One 0.05 s double detection and one 2.5 s dropout among 0.8 s beats
        let peaks = [0, 160, 170, 330, 490, 990, 1150];
        let hr = estimator.estimate(&peaks, 200).unwrap();
        assert_eq!(hr.bpm(), 75.0);
    }

    #[test]
    fn test_median_of_even_count_and_rounding() {
        let estimator = BpmEstimator::default();
        // intervals 0.7 s and 0.8 s -> median 0.75 s -> 80 BPM
        assert_eq!(estimator.estimate(&[0, 140, 300], 200).unwrap().bpm(), 80.0);
        // single 0.7 s interval -> 85.714.. -> 85.7
        assert_eq!(estimator.estimate(&[0, 140], 200).unwrap().bpm(), 85.7);
    }

    #[test]
    fn test_band_edges_are_inclusive() {
        let estimator = BpmEstimator::default();
        // 0.3 s -> 200 BPM, 2.0 s -> 30 BPM
        assert_eq!(estimator.estimate(&[0, 60], 200).unwrap().bpm(), 200.0);
        assert_eq!(estimator.estimate(&[0, 400], 200).unwrap().bpm(), 30.0);
    }

    #[test]
    fn test_result_never_leaves_plausible_range() {
        // A widened interval band still cannot surface an implausible rate
        let estimator = BpmEstimator::new(0.1, 10.0);
        assert_eq!(estimator.estimate(&[0, 20], 200), None); // 600 BPM
        assert_eq!(estimator.estimate(&[0, 1000], 200), None); // 12 BPM
    }
}
