//! Heart-rate values and sampling-rate bounds

use crate::error::{EcgError, EcgResult};
use serde::Serialize;
use std::fmt;

/// Lowest heart rate ever surfaced (BPM)
pub const MIN_BPM: f32 = 30.0;
/// Highest heart rate ever surfaced (BPM)
pub const MAX_BPM: f32 = 220.0;

/// A physiologically plausible heart-rate estimate.
///
/// The only constructor rejects non-finite values and anything outside
/// [`MIN_BPM`]..=[`MAX_BPM`], so "no estimate" is always `None` and never a
/// zero or NaN in disguise.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct HeartRate(f32);

impl HeartRate {
    pub fn new(bpm: f32) -> Option<Self> {
        if bpm.is_finite() && (MIN_BPM..=MAX_BPM).contains(&bpm) {
            Some(HeartRate(bpm))
        } else {
            None
        }
    }

    /// Beats per minute
    pub fn bpm(self) -> f32 {
        self.0
    }

    /// Mean beat-to-beat interval in seconds
    pub fn beat_interval_secs(self) -> f32 {
        60.0 / self.0
    }
}

impl fmt::Display for HeartRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.0)
    }
}

/// Sampling rates accepted for a single-lead ECG stream (Hz)
pub const MIN_SAMPLING_RATE_HZ: u32 = 50;
pub const MAX_SAMPLING_RATE_HZ: u32 = 2000;

/// Validate sampling rate for ECG streams
pub fn validate_sampling_rate(rate: u32) -> EcgResult<()> {
    if !(MIN_SAMPLING_RATE_HZ..=MAX_SAMPLING_RATE_HZ).contains(&rate) {
        Err(EcgError::InvalidSamplingRate {
            rate,
            valid_range: format!("{}-{}Hz", MIN_SAMPLING_RATE_HZ, MAX_SAMPLING_RATE_HZ),
        })
    } else {
        Ok(())
    }
}

/// Convert a duration in seconds to a whole number of samples, never below one
pub fn secs_to_samples(secs: f32, sampling_rate_hz: u32) -> usize {
    let samples = (secs * sampling_rate_hz as f32).round();
    if samples.is_finite() && samples >= 1.0 {
        samples as usize
    } else {
        1
    }
}
