//! Core filter trait and analysis timing types

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Core trait for per-sample smoothing filters.
///
/// Implementations never fail: out-of-range construction parameters are
/// clamped so `push` is always well-defined.
pub trait SampleFilter: Send {
    /// Feed one raw sample, get the filtered value
    fn push(&mut self, sample: f32) -> f32;

    /// Forget all history; the next push behaves like the first
    fn reset(&mut self);

    /// Get filter name/identifier
    fn name(&self) -> &str;

    /// Approximate group delay in samples
    fn latency_estimate(&self) -> f32 {
        0.0
    }
}

/// Running totals over analysis cycles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    /// Cycles run so far
    pub cycles: u64,
    /// Cycles that produced a plausible estimate
    pub estimates: u64,
    /// Summed cycle time in microseconds
    pub total_time_us: u64,
    /// Duration of the most recent cycle in microseconds
    pub last_time_us: u64,
}

impl AnalysisMetrics {
    pub fn record(&mut self, elapsed_us: u64, produced_estimate: bool) {
        self.cycles += 1;
        self.total_time_us += elapsed_us;
        self.last_time_us = elapsed_us;
        if produced_estimate {
            self.estimates += 1;
        }
    }

    pub fn average_time_us(&self) -> u64 {
        if self.cycles == 0 {
            0
        } else {
            self.total_time_us / self.cycles
        }
    }

    /// Fraction of cycles that yielded an estimate (1.0 before any cycle)
    pub fn estimate_rate(&self) -> f32 {
        if self.cycles == 0 {
            1.0
        } else {
            self.estimates as f32 / self.cycles as f32
        }
    }
}

/// Helper for timing one analysis cycle
pub struct AnalysisTimer {
    start_time: Instant,
}

impl AnalysisTimer {
    pub fn start() -> Self {
        AnalysisTimer {
            start_time: Instant::now(),
        }
    }

    /// Elapsed microseconds since start
    pub fn finish(self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_analysis_metrics() {
        let mut metrics = AnalysisMetrics::default();
        assert_eq!(metrics.average_time_us(), 0);
        assert_eq!(metrics.estimate_rate(), 1.0);

        metrics.record(100, true);
        metrics.record(300, false);

        assert_eq!(metrics.cycles, 2);
        assert_eq!(metrics.estimates, 1);
        assert_eq!(metrics.average_time_us(), 200);
        assert_eq!(metrics.last_time_us, 300);
        assert_eq!(metrics.estimate_rate(), 0.5);
    }

    /// Keeps its state in a `Cell`: movable between threads, not shareable
    struct LastValue {
        last: std::cell::Cell<f32>,
    }

    impl SampleFilter for LastValue {
        fn push(&mut self, sample: f32) -> f32 {
            let previous = self.last.replace(sample);
            (previous + sample) / 2.0
        }

        fn reset(&mut self) {
            self.last.set(0.0);
        }

        fn name(&self) -> &str {
            "Last Value"
        }
    }

    #[test]
    fn test_filters_need_not_be_sync() {
        let filter: Box<dyn SampleFilter> = Box::new(LastValue {
            last: std::cell::Cell::new(0.0),
        });
        let worker = std::thread::spawn(move || {
            let mut filter = filter;
            filter.push(2.0);
            filter.push(4.0)
        });
        assert_eq!(worker.join().unwrap(), 3.0);
    }

    #[test]
    fn test_analysis_timer() {
        let timer = AnalysisTimer::start();
        std::thread::sleep(Duration::from_millis(1));
        assert!(timer.finish() >= 1000);
    }
}
