//! Baseline drift removal ahead of peak search
//!
//! Respiration and electrode movement add a slow offset to the signal. The
//! baseline is a centred moving average; the signal is treated as zero
//! beyond both ends, so the first and last half-window of the output is
//! lifted toward the raw signal.

use ecg_core::secs_to_samples;
use serde::{Deserialize, Serialize};

/// Default baseline window, seconds
pub const DEFAULT_BASELINE_WINDOW_SECS: f32 = 0.2;

/// Centred moving-average baseline estimator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineEstimator {
    /// Window length in seconds
    pub window_secs: f32,
}

impl Default for BaselineEstimator {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_BASELINE_WINDOW_SECS,
        }
    }
}

impl BaselineEstimator {
    pub fn new(window_secs: f32) -> Self {
        Self { window_secs }
    }

    /// Window length in samples, never below one
    pub fn window_len(&self, sampling_rate_hz: u32) -> usize {
        secs_to_samples(self.window_secs, sampling_rate_hz)
    }

    /// Baseline estimate for every index (same length as `signal`).
    ///
    /// For window length `w`, index `i` averages `signal[i - w/2 ..= i + (w - 1 - w/2)]`
    /// with out-of-range positions counted as zero; the divisor is always `w`.
    pub fn estimate(&self, signal: &[f32], sampling_rate_hz: u32) -> Vec<f32> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        let w = self.window_len(sampling_rate_hz);
        let left = w / 2;
        let right = w - 1 - left;

        // prefix[k] = sum of signal[..k]
        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(0.0f64);
        let mut running = 0.0f64;
        for &x in signal {
            running += x as f64;
            prefix.push(running);
        }

        (0..n)
            .map(|i| {
                let start = i.saturating_sub(left);
                let end = (i + right).min(n - 1);
                ((prefix[end + 1] - prefix[start]) / w as f64) as f32
            })
            .collect()
    }

    /// Signal minus its baseline (same length as `signal`)
    pub fn remove_baseline(&self, signal: &[f32], sampling_rate_hz: u32) -> Vec<f32> {
        let baseline = self.estimate(signal, sampling_rate_hz);
        signal
            .iter()
            .zip(baseline)
            .map(|(&x, b)| x - b)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-5,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_window_length() {
        let estimator = BaselineEstimator::default();
        assert_eq!(estimator.window_len(200), 40);
        assert_eq!(estimator.window_len(250), 50);
        assert_eq!(estimator.window_len(2), 1);
    }

    #[test]
    fn test_output_length_matches_input() {
        let estimator = BaselineEstimator::default();
        assert!(estimator.remove_baseline(&[], 200).is_empty());

        let signal: Vec<f32> = (0..333).map(|i| (i as f32 * 0.1).sin()).collect();
        assert_eq!(estimator.remove_baseline(&signal, 200).len(), 333);
    }

    #[test]
    fn test_constant_signal_zero_padded_edges() {
        // fs = 50 -> w = 10, window spans i-5 ..= i+4
        let estimator = BaselineEstimator::default();
        let signal = vec![2.0f32; 100];
        let cleaned = estimator.remove_baseline(&signal, 50);

        for &value in &cleaned[5..=95] {
            assert_close(value, 0.0);
        }

        // i = 0 sees 5 real samples, i = 99 sees 6
        assert_close(cleaned[0], 2.0 - 2.0 * 5.0 / 10.0);
        assert_close(cleaned[99], 2.0 - 2.0 * 6.0 / 10.0);
        // Edge lift shrinks monotonically toward the interior
        assert!(cleaned[0] > cleaned[1] && cleaned[1] > cleaned[2]);
    }

    #[test]
    fn test_single_sample_window_removes_everything() {
        let estimator = BaselineEstimator::new(0.2);
        let signal = [1.0, 5.0, -3.0, 2.5];
        for value in estimator.remove_baseline(&signal, 2) {
            assert_close(value, 0.0);
        }
    }

    #[test]
    fn test_slow_drift_is_removed_spike_survives() {
        let estimator = BaselineEstimator::default();
        let fs = 200;
        let mut signal: Vec<f32> = (0..1000).map(|i| 1.0 + i as f32 * 0.001).collect();
        signal[500] += 1.0;

        let cleaned = estimator.remove_baseline(&signal, fs);

        // Linear drift averages out over a centred window
        assert!(cleaned[300].abs() < 0.01);
        assert!(cleaned[700].abs() < 0.01);
        // Spike keeps most of its height: window 480..=519 averages the ramp
        // to 1.4995 and adds 1.0 / 40 from the spike itself
        assert!((cleaned[500] - (2.5 - 1.4995 - 0.025)).abs() < 1e-4);
    }
}
