//! Configuration management for the ECG pipeline

use crate::baseline::BaselineEstimator;
use crate::bpm::BpmEstimator;
use crate::peaks::PeakDetector;
use crate::smoother::{SmoothingConfig, SmoothingMode};
use ecg_core::{validate_sampling_rate, EcgError, EcgResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Pipeline configuration: stream shape, smoothing and analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Nominal sampling rate of the input stream (Hz)
    pub sampling_rate_hz: u32,
    /// Ring buffer capacity (samples)
    pub buffer_size: usize,
    /// Per-sample smoothing
    pub smoothing: SmoothingConfig,
    /// Periodic heart-rate analysis
    pub analysis: AnalysisConfig,
}

/// Parameters of the periodic analysis cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Wall-clock seconds between analysis cycles
    pub interval_secs: f32,
    /// Buffered signal required before a cycle may run, seconds
    pub min_buffer_secs: f32,
    /// Baseline moving-average window, seconds
    pub baseline_window_secs: f32,
    /// Threshold = median + ratio * (p90 - median)
    pub threshold_ratio: f32,
    /// Refractory period between peaks, seconds
    pub refractory_secs: f32,
    /// Shortest accepted beat interval, seconds
    pub min_interval_secs: f32,
    /// Longest accepted beat interval, seconds
    pub max_interval_secs: f32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 200,
            buffer_size: 1000,
            smoothing: SmoothingConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interval_secs: 2.0,
            min_buffer_secs: 2.0,
            baseline_window_secs: crate::baseline::DEFAULT_BASELINE_WINDOW_SECS,
            threshold_ratio: crate::peaks::DEFAULT_THRESHOLD_RATIO,
            refractory_secs: crate::peaks::DEFAULT_REFRACTORY_SECS,
            min_interval_secs: crate::bpm::DEFAULT_MIN_INTERVAL_SECS,
            max_interval_secs: crate::bpm::DEFAULT_MAX_INTERVAL_SECS,
        }
    }
}

impl AnalysisConfig {
    pub fn baseline(&self) -> BaselineEstimator {
        BaselineEstimator::new(self.baseline_window_secs)
    }

    pub fn peak_detector(&self) -> PeakDetector {
        PeakDetector::new(self.threshold_ratio, self.refractory_secs)
    }

    pub fn bpm_estimator(&self) -> BpmEstimator {
        BpmEstimator::new(self.min_interval_secs, self.max_interval_secs)
    }

    /// Cycle cadence as a `Duration`; fails when `interval_secs` does not fit
    pub fn interval(&self) -> EcgResult<Duration> {
        Duration::try_from_secs_f32(self.interval_secs).map_err(|e| {
            EcgError::config(format!(
                "Analysis interval of {} s is not representable: {}",
                self.interval_secs, e
            ))
        })
    }
}

impl ProcessingConfig {
    /// Exponential smoothing preset
    pub fn exponential(sampling_rate_hz: u32, alpha: f32) -> Self {
        Self {
            sampling_rate_hz,
            smoothing: SmoothingConfig::exponential(alpha),
            ..Default::default()
        }
    }

    /// Moving-average smoothing preset
    pub fn moving_average(sampling_rate_hz: u32, window: usize) -> Self {
        Self {
            sampling_rate_hz,
            smoothing: SmoothingConfig::moving_average(window),
            ..Default::default()
        }
    }

    /// Samples the buffer must hold before analysis may run
    pub fn min_buffer_samples(&self) -> usize {
        (self.analysis.min_buffer_secs * self.sampling_rate_hz as f32).ceil() as usize
    }

    /// Validate configuration
    pub fn validate(&self) -> EcgResult<()> {
        validate_sampling_rate(self.sampling_rate_hz)?;

        if self.buffer_size == 0 {
            return Err(EcgError::config("Buffer size must be greater than 0"));
        }

        if self.smoothing.mode == SmoothingMode::MovingAverage && self.smoothing.window == 0 {
            return Err(EcgError::config("Moving-average window must be at least 1"));
        }

        let analysis = &self.analysis;
        let positive = [
            ("interval_secs", analysis.interval_secs),
            ("baseline_window_secs", analysis.baseline_window_secs),
            ("refractory_secs", analysis.refractory_secs),
            ("min_interval_secs", analysis.min_interval_secs),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(EcgError::config(format!(
                    "Analysis parameter '{}' must be positive, got {}",
                    name, value
                )));
            }
        }
        analysis.interval()?;

        if !(analysis.min_buffer_secs.is_finite() && analysis.min_buffer_secs >= 0.0) {
            return Err(EcgError::config("Minimum buffered duration must not be negative"));
        }

        if !(0.0..=1.0).contains(&analysis.threshold_ratio) {
            return Err(EcgError::config(format!(
                "Threshold ratio must be within [0, 1], got {}",
                analysis.threshold_ratio
            )));
        }

        if analysis.max_interval_secs <= analysis.min_interval_secs {
            return Err(EcgError::config(format!(
                "Beat interval band is empty: [{}, {}]",
                analysis.min_interval_secs, analysis.max_interval_secs
            )));
        }

        if self.min_buffer_samples() > self.buffer_size {
            return Err(EcgError::config(format!(
                "Buffer of {} samples can never hold the {} required for analysis",
                self.buffer_size,
                self.min_buffer_samples()
            )));
        }

        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> EcgResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EcgError::config(format!("Failed to serialize configuration: {}", e)))
    }

    /// Import configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> EcgResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EcgError::config(format!("Failed to deserialize configuration: {}", e)))
    }
}
