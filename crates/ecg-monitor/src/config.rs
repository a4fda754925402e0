//! Monitor configuration: JSON file with defaults, then CLI overrides

use crate::display::DisplayMode;
use ecg_core::{EcgError, EcgResult};
use ecg_processing::ProcessingConfig;
use ecg_simulation::{EcgSimConfig, HeartRhythm, LineStreamConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where samples come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Serial device (discovered or configured port)
    Serial,
    /// Lines on standard input, e.g. a recorded session
    Stdin,
    /// Built-in ECG simulator
    Simulate,
}

/// Serial device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Port tried first; discovery runs when it is absent
    pub preferred_port: Option<String>,
    pub baud_rate: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            preferred_port: Some("/dev/ttyACM0".to_string()),
            baud_rate: 115_200,
        }
    }
}

/// Live view settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Initial display mode
    pub mode: DisplayMode,
    /// Fixed Y range in volts; `None` enables autoscaling
    pub y_range: Option<[f32; 2]>,
    /// Sparkline width in characters
    pub width: usize,
    /// Redraw period
    pub refresh_ms: u64,
    /// Minimum time between autoscale updates
    pub autoscale_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Waveform,
            y_range: Some([0.0, 3.3]),
            width: 60,
            refresh_ms: 100,
            autoscale_interval_ms: 500,
        }
    }
}

/// Built-in simulator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub signal: EcgSimConfig,
    pub stream: LineStreamConfig,
}

/// Complete monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub source: SourceKind,
    pub device: DeviceConfig,
    pub processing: ProcessingConfig,
    pub display: DisplayConfig,
    pub simulation: SimulationConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Serial,
            device: DeviceConfig::default(),
            processing: ProcessingConfig::default(),
            display: DisplayConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub source: Option<SourceKind>,
    pub port: Option<String>,
    pub baud_rate: Option<u32>,
    pub rhythm: Option<HeartRhythm>,
    pub simulated_bpm: Option<f32>,
    pub numeric: bool,
}

impl MonitorConfig {
    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> EcgResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            EcgError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> EcgResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| EcgError::config(format!("Failed to deserialize configuration: {}", e)))
    }

    pub fn to_json(&self) -> EcgResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EcgError::config(format!("Failed to serialize configuration: {}", e)))
    }

    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(source) = overrides.source {
            self.source = source;
        }
        if let Some(port) = overrides.port {
            self.device.preferred_port = Some(port);
        }
        if let Some(baud_rate) = overrides.baud_rate {
            self.device.baud_rate = baud_rate;
        }
        if let Some(rhythm) = overrides.rhythm {
            self.simulation.signal.rhythm = rhythm;
        }
        // A fixed rate wins over a named rhythm
        if let Some(bpm) = overrides.simulated_bpm {
            self.simulation.signal.rhythm = HeartRhythm::Steady { bpm };
        }
        if overrides.numeric {
            self.display.mode = DisplayMode::Numeric;
        }
    }

    /// Simulator settings aligned with the pipeline's sampling rate
    pub fn simulator_config(&self) -> EcgSimConfig {
        EcgSimConfig {
            sampling_rate_hz: self.processing.sampling_rate_hz,
            ..self.simulation.signal.clone()
        }
    }

    pub fn validate(&self) -> EcgResult<()> {
        self.processing.validate()?;

        if self.device.baud_rate == 0 {
            return Err(EcgError::config("Baud rate must be greater than 0"));
        }

        if let Some([low, high]) = self.display.y_range {
            if !(low.is_finite() && high.is_finite() && low < high) {
                return Err(EcgError::config(format!(
                    "Display range must satisfy min < max, got [{}, {}]",
                    low, high
                )));
            }
        }

        if self.display.width == 0 {
            return Err(EcgError::config("Display width must be greater than 0"));
        }

        if self.display.refresh_ms == 0 {
            return Err(EcgError::config("Display refresh period must be greater than 0"));
        }

        if self.source == SourceKind::Simulate {
            self.simulator_config().validate()?;
        }

        Ok(())
    }
}
