//! ECG-Core: Foundation types for single-lead heart-rate monitoring
//!
//! Minimal shared types: errors, sample parsing, heart-rate values and the
//! signal window handed to the analysis stage.

pub mod error;
pub mod heart_rate;
pub mod sample;
pub mod signal_window;

pub use error::{EcgError, EcgResult};
pub use heart_rate::*;
pub use sample::*;
pub use signal_window::*;
