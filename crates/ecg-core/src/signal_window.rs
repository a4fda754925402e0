//! SignalWindow: immutable snapshot of recent samples handed to analysis

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Snapshot of the most recent samples, oldest first.
///
/// Analysis works on this owned copy while ingestion keeps appending to the
/// live buffer, so a window is never mutated after capture.
#[derive(Debug, Clone)]
pub struct SignalWindow {
    /// Unique identifier, used to correlate analysis logs
    pub id: Uuid,
    /// Samples, oldest to newest
    pub samples: Vec<f32>,
    /// Sampling rate in Hz
    pub sampling_rate_hz: u32,
    /// Capture timestamp (ms since the Unix epoch)
    pub captured_at_ms: u64,
}

impl SignalWindow {
    pub fn new(samples: Vec<f32>, sampling_rate_hz: u32) -> Self {
        SignalWindow {
            id: Uuid::new_v4(),
            samples,
            sampling_rate_hz,
            captured_at_ms: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Window span in seconds
    pub fn duration_secs(&self) -> f32 {
        if self.sampling_rate_hz == 0 {
            0.0
        } else {
            self.samples.len() as f32 / self.sampling_rate_hz as f32
        }
    }

    pub fn stats(&self) -> WindowStats {
        WindowStats::calculate(&self.samples)
    }
}

/// Basic statistics over a run of samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub mean: f32,
    pub min: f32,
    pub max: f32,
    pub peak_to_peak: f32,
}

impl WindowStats {
    pub fn calculate(data: &[f32]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let sum: f64 = data.iter().map(|&x| x as f64).sum();
        let mean = (sum / data.len() as f64) as f32;

        let min = data.iter().fold(f32::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}

/// Percentile `p` (0..=100) with linear interpolation between closest ranks.
///
/// Rank is `p / 100 * (n - 1)` over the sorted values. Returns `None` for
/// empty input.
pub fn percentile(values: &[f32], p: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f32;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Median; the mean of the two middle values for even-length input
pub fn median(values: &[f32]) -> Option<f32> {
    percentile(values, 50.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_duration() {
        let window = SignalWindow::new(vec![0.0; 400], 200);
        assert_eq!(window.len(), 400);
        assert!((window.duration_secs() - 2.0).abs() < 1e-6);
        assert_eq!(SignalWindow::new(Vec::new(), 200).duration_secs(), 0.0);
    }

    #[test]
    fn test_windows_get_distinct_ids() {
        let a = SignalWindow::new(vec![1.0], 200);
        let b = SignalWindow::new(vec![1.0], 200);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_window_stats() {
        let stats = WindowStats::calculate(&[1.0, 2.0, 3.0, 6.0]);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 6.0);
        assert_eq!(stats.peak_to_peak, 5.0);

        let empty = WindowStats::calculate(&[]);
        assert_eq!(empty.peak_to_peak, 0.0);

        let window = SignalWindow::new(vec![0.5, 1.5], 200);
        assert_eq!(window.stats().mean, 1.0);
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[3.0]), Some(3.0));
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_percentile_interpolates() {
        let values: Vec<f32> = (0..=10).map(|i| i as f32).collect();
        assert!((percentile(&values, 90.0).unwrap() - 9.0).abs() < 1e-5);
        assert_eq!(percentile(&values, 0.0), Some(0.0));
        assert_eq!(percentile(&values, 100.0), Some(10.0));

        // rank = 0.9 * 3 = 2.7 -> 3 + 0.7 * (4 - 3)
        let p90 = percentile(&[1.0, 2.0, 3.0, 4.0], 90.0).unwrap();
        assert!((p90 - 3.7).abs() < 1e-5);
    }
}
