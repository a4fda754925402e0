//! ECG-Processing: Streaming heart-rate pipeline
//!
//! Per-sample smoothing into a bounded window, plus a periodic batch
//! analysis (baseline removal, adaptive peak detection, BPM estimation).

pub mod baseline;
pub mod bpm;
pub mod config;
pub mod peaks;
pub mod pipeline;
pub mod processor;
pub mod ring_buffer;
pub mod smoother;

pub use baseline::BaselineEstimator;
pub use bpm::BpmEstimator;
pub use config::{AnalysisConfig, ProcessingConfig};
pub use peaks::{PeakCandidate, PeakDetector};
pub use pipeline::{AnalysisReport, Pipeline};
pub use processor::{AnalysisMetrics, AnalysisTimer, SampleFilter};
pub use ring_buffer::RingBuffer;
pub use smoother::{
    build_smoother, ExponentialSmoother, MovingAverageSmoother, SmoothingConfig, SmoothingMode,
};
