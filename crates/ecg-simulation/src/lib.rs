//! ECG-Simulation: synthetic single-lead ECG for testing and demos
//!
//! Generates PQRST beats at a configurable rhythm with noise, baseline
//! wander and occasional corrupted lines, and streams them at the nominal
//! sampling rate the way a serial device would.

pub mod ecg_simulator;
pub mod heart_rhythm;
pub mod line_stream;

pub use ecg_simulator::*;
pub use heart_rhythm::*;
pub use line_stream::*;
