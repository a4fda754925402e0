//! Per-sample smoothing filters for the live signal

use crate::processor::SampleFilter;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Smoothing strategies supported by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMode {
    /// First-order IIR (exponential) smoothing
    Exponential,
    /// Simple moving average over the last N raw inputs
    MovingAverage,
}

/// Smoothing configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Strategy
    pub mode: SmoothingMode,
    /// Exponential weight of the newest sample (0..1)
    pub alpha: f32,
    /// Moving-average window in samples
    pub window: usize,
}

impl SmoothingConfig {
    /// Create exponential smoothing configuration
    pub fn exponential(alpha: f32) -> Self {
        Self {
            mode: SmoothingMode::Exponential,
            alpha,
            ..Default::default()
        }
    }

    /// Create moving average configuration
    pub fn moving_average(window: usize) -> Self {
        Self {
            mode: SmoothingMode::MovingAverage,
            window,
            ..Default::default()
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            mode: SmoothingMode::Exponential,
            alpha: 0.2,
            window: 7,
        }
    }
}

/// Build the configured smoother
pub fn build_smoother(config: &SmoothingConfig) -> Box<dyn SampleFilter> {
    match config.mode {
        SmoothingMode::Exponential => Box::new(ExponentialSmoother::new(config.alpha)),
        SmoothingMode::MovingAverage => Box::new(MovingAverageSmoother::new(config.window)),
    }
}

/// Exponential smoother: `y <- y + alpha * (x - y)`, seeded with the first sample
#[derive(Debug, Clone)]
pub struct ExponentialSmoother {
    alpha: f32,
    state: Option<f32>,
}

impl ExponentialSmoother {
    /// Create new exponential smoother; `alpha` is clamped to [0, 1]
    pub fn new(alpha: f32) -> Self {
        let alpha = if alpha.is_nan() { 0.0 } else { alpha.clamp(0.0, 1.0) };
        ExponentialSmoother { alpha, state: None }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }
}

impl SampleFilter for ExponentialSmoother {
    fn push(&mut self, sample: f32) -> f32 {
        let next = match self.state {
            // First sample seeds the state
            None => sample,
            Some(y) => y + self.alpha * (sample - y),
        };
        self.state = Some(next);
        next
    }

    fn reset(&mut self) {
        self.state = None;
    }

    fn name(&self) -> &str {
        "Exponential Smoother"
    }

    fn latency_estimate(&self) -> f32 {
        if self.alpha > 0.0 {
            (1.0 - self.alpha) / self.alpha
        } else {
            f32::INFINITY
        }
    }
}

/// Moving average smoother over the last `window` raw inputs
#[derive(Debug, Clone)]
pub struct MovingAverageSmoother {
    window: usize,
    buffer: VecDeque<f32>,
    // f64 keeps the running sum from drifting over long sessions
    sum: f64,
}

impl MovingAverageSmoother {
    /// Create new moving average smoother; `window` is clamped to at least 1
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        MovingAverageSmoother {
            window,
            buffer: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl SampleFilter for MovingAverageSmoother {
    fn push(&mut self, sample: f32) -> f32 {
        self.buffer.push_back(sample);
        self.sum += sample as f64;

        if self.buffer.len() > self.window {
            if let Some(old_sample) = self.buffer.pop_front() {
                self.sum -= old_sample as f64;
            }
        }

        (self.sum / self.buffer.len() as f64) as f32
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.sum = 0.0;
    }

    fn name(&self) -> &str {
        "Moving Average Smoother"
    }

    fn latency_estimate(&self) -> f32 {
        (self.window as f32 - 1.0) / 2.0
    }
}
