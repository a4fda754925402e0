//! Streaming pipeline: per-sample smoothing plus periodic heart-rate analysis
//!
//! `ingest` runs on every sample and only touches the smoother and the ring
//! buffer. `poll` is called on a timer and runs a full batch analysis on a
//! snapshot once the cadence and the buffered duration allow it.

use crate::baseline::BaselineEstimator;
use crate::bpm::BpmEstimator;
use crate::config::ProcessingConfig;
use crate::peaks::PeakDetector;
use crate::processor::{AnalysisMetrics, AnalysisTimer, SampleFilter};
use crate::ring_buffer::RingBuffer;
use crate::smoother::build_smoother;
use ecg_core::{EcgResult, HeartRate, SignalWindow, WindowStats};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Outcome of one analysis cycle
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    /// Id of the snapshot that was analysed
    pub window_id: Uuid,
    /// Samples in the snapshot
    pub sample_count: usize,
    /// Level and amplitude of the snapshot before baseline removal
    pub signal: WindowStats,
    /// Accepted peak indices within the snapshot
    pub peaks: Vec<usize>,
    /// Estimate from this cycle; `None` leaves the surfaced BPM unchanged
    pub estimate: Option<HeartRate>,
    /// Cycle duration in microseconds
    pub elapsed_us: u64,
}

/// Single-lead ECG processing pipeline
pub struct Pipeline {
    config: ProcessingConfig,
    smoother: Box<dyn SampleFilter>,
    buffer: RingBuffer,
    baseline: BaselineEstimator,
    detector: PeakDetector,
    estimator: BpmEstimator,
    analysis_interval: Duration,
    min_buffer_samples: usize,
    filter_enabled: bool,
    current_bpm: Option<HeartRate>,
    last_analysis: Option<Instant>,
    metrics: AnalysisMetrics,
    samples_ingested: u64,
}

impl Pipeline {
    /// Create a pipeline from a validated configuration
    pub fn new(config: ProcessingConfig) -> EcgResult<Self> {
        config.validate()?;
        let analysis_interval = config.analysis.interval()?;

        let smoother = build_smoother(&config.smoothing);
        let buffer = RingBuffer::new(config.buffer_size);
        debug!(
            smoother = smoother.name(),
            latency_samples = smoother.latency_estimate(),
            buffer_capacity = buffer.capacity(),
            sampling_rate_hz = config.sampling_rate_hz,
            "pipeline created"
        );

        Ok(Pipeline {
            smoother,
            buffer,
            baseline: config.analysis.baseline(),
            detector: config.analysis.peak_detector(),
            estimator: config.analysis.bpm_estimator(),
            analysis_interval,
            min_buffer_samples: config.min_buffer_samples(),
            filter_enabled: true,
            current_bpm: None,
            last_analysis: None,
            metrics: AnalysisMetrics::default(),
            samples_ingested: 0,
            config,
        })
    }

    /// Feed one raw sample; returns the value appended to the buffer.
    ///
    /// With the filter disabled the raw value is buffered and the smoother
    /// keeps its state untouched.
    pub fn ingest(&mut self, raw: f32) -> f32 {
        let value = if self.filter_enabled {
            self.smoother.push(raw)
        } else {
            raw
        };
        self.buffer.append(value);
        self.samples_ingested += 1;
        value
    }

    pub fn set_filter_enabled(&mut self, enabled: bool) {
        if self.filter_enabled != enabled {
            debug!(enabled, "smoothing filter toggled");
        }
        self.filter_enabled = enabled;
    }

    pub fn filter_enabled(&self) -> bool {
        self.filter_enabled
    }

    /// Copy of the buffered series, oldest first
    pub fn series(&self) -> Vec<f32> {
        self.buffer.snapshot()
    }

    /// Immutable snapshot for analysis
    pub fn snapshot(&self) -> SignalWindow {
        SignalWindow::new(self.buffer.snapshot(), self.config.sampling_rate_hz)
    }

    /// True when a cycle may run at `now`
    pub fn analysis_due(&self, now: Instant) -> bool {
        if self.buffer.len() < self.min_buffer_samples {
            return false;
        }
        match self.last_analysis {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.analysis_interval,
        }
    }

    /// Run a cycle if one is due at `now`
    pub fn poll(&mut self, now: Instant) -> Option<AnalysisReport> {
        if !self.analysis_due(now) {
            return None;
        }
        self.last_analysis = Some(now);
        Some(self.analyze())
    }

    /// Run one analysis cycle on the current buffer, regardless of cadence
    pub fn analyze(&mut self) -> AnalysisReport {
        let timer = AnalysisTimer::start();
        let window = self.snapshot();
        let fs = window.sampling_rate_hz;
        let signal = window.stats();

        let cleaned = self.baseline.remove_baseline(&window.samples, fs);
        let peaks = self.detector.find_peaks(&cleaned, fs);
        let estimate = self.estimator.estimate(&peaks, fs);

        if estimate.is_some() {
            self.current_bpm = estimate;
        }

        let elapsed_us = timer.finish();
        self.metrics.record(elapsed_us, estimate.is_some());

        debug!(
            window_id = %window.id,
            samples = window.len(),
            peaks = peaks.len(),
            peak_to_peak = signal.peak_to_peak,
            bpm = ?estimate.map(HeartRate::bpm),
            elapsed_us,
            "analysis cycle"
        );

        AnalysisReport {
            window_id: window.id,
            sample_count: window.len(),
            signal,
            peaks,
            estimate,
            elapsed_us,
        }
    }

    /// Most recent plausible estimate
    pub fn current_bpm(&self) -> Option<HeartRate> {
        self.current_bpm
    }

    pub fn metrics(&self) -> &AnalysisMetrics {
        &self.metrics
    }

    pub fn samples_ingested(&self) -> u64 {
        self.samples_ingested
    }

    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// Smoother name and approximate group delay in samples
    pub fn smoother_info(&self) -> (&str, f32) {
        (self.smoother.name(), self.smoother.latency_estimate())
    }
}
