//! Adaptive-threshold peak detection on a baseline-removed window
//!
//! The threshold tracks the window's own amplitude statistics rather than a
//! fixed voltage, and a refractory distance keeps one peak per beat.

use ecg_core::{median, percentile, secs_to_samples};
use serde::{Deserialize, Serialize};

/// Default share of the median-to-p90 spread added to the median
pub const DEFAULT_THRESHOLD_RATIO: f32 = 0.35;
/// Default refractory period between accepted peaks, seconds
pub const DEFAULT_REFRACTORY_SECS: f32 = 0.3;

/// A local maximum considered during one analysis cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakCandidate {
    pub index: usize,
    pub magnitude: f32,
}

/// Local-maximum detector with adaptive threshold and refractory rule
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakDetector {
    /// Threshold = median + ratio * (p90 - median)
    pub threshold_ratio: f32,
    /// Minimum spacing between accepted peaks, seconds
    pub refractory_secs: f32,
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self {
            threshold_ratio: DEFAULT_THRESHOLD_RATIO,
            refractory_secs: DEFAULT_REFRACTORY_SECS,
        }
    }
}

impl PeakDetector {
    pub fn new(threshold_ratio: f32, refractory_secs: f32) -> Self {
        Self {
            threshold_ratio,
            refractory_secs,
        }
    }

    /// Refractory distance in samples, never below one
    pub fn min_distance(&self, sampling_rate_hz: u32) -> usize {
        secs_to_samples(self.refractory_secs, sampling_rate_hz)
    }

    /// Adaptive threshold for a window; `None` when the window is empty
    pub fn threshold(&self, signal: &[f32]) -> Option<f32> {
        let median = median(signal)?;
        let p90 = percentile(signal, 90.0)?;
        Some(median + self.threshold_ratio * (p90 - median))
    }

    /// Indices of accepted peaks, ascending.
    ///
    /// Needs at least one second of signal; shorter input yields no peaks.
    pub fn find_peaks(&self, signal: &[f32], sampling_rate_hz: u32) -> Vec<usize> {
        if sampling_rate_hz == 0 || signal.len() < sampling_rate_hz as usize {
            return Vec::new();
        }

        let Some(threshold) = self.threshold(signal) else {
            return Vec::new();
        };

        let candidates = local_maxima_above(signal, threshold);
        enforce_refractory(&candidates, self.min_distance(sampling_rate_hz))
            .into_iter()
            .map(|peak| peak.index)
            .collect()
    }
}

/// Strict interior local maxima strictly above `threshold`
pub fn local_maxima_above(signal: &[f32], threshold: f32) -> Vec<PeakCandidate> {
    signal
        .windows(3)
        .enumerate()
        .filter_map(|(offset, w)| {
            let (prev, value, next) = (w[0], w[1], w[2]);
            (value > prev && value > next && value > threshold).then_some(PeakCandidate {
                index: offset + 1,
                magnitude: value,
            })
        })
        .collect()
}

/// Apply the refractory rule to candidates in ascending index order.
///
/// A candidate closer than `min_distance` samples to the most recently
/// accepted peak replaces it when strictly stronger and is dropped
/// otherwise.
pub fn enforce_refractory(candidates: &[PeakCandidate], min_distance: usize) -> Vec<PeakCandidate> {
    let mut accepted: Vec<PeakCandidate> = Vec::with_capacity(candidates.len());

    for &candidate in candidates {
        match accepted.last_mut() {
            Some(last) if candidate.index - last.index < min_distance => {
                if candidate.magnitude > last.magnitude {
                    *last = candidate;
                }
            }
            _ => accepted.push(candidate),
        }
    }

    accepted
}
