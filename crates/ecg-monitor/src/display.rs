//! Terminal live view: sparkline or numeric readout plus BPM

use crate::config::DisplayConfig;
use ecg_core::HeartRate;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::{Duration, Instant};

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Autoscale never runs on fewer points than this
pub const AUTOSCALE_MIN_POINTS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Sparkline of the buffered series
    Waveform,
    /// Latest value only
    Numeric,
}

impl DisplayMode {
    pub fn toggled(self) -> Self {
        match self {
            DisplayMode::Waveform => DisplayMode::Numeric,
            DisplayMode::Numeric => DisplayMode::Waveform,
        }
    }
}

/// Anything that can show the live series and heart rate
pub trait SignalDisplay {
    /// Redraw with the latest series (oldest first) and estimate
    fn update(&mut self, series: &[f32], bpm: Option<HeartRate>) -> io::Result<()>;

    fn set_mode(&mut self, mode: DisplayMode);

    fn set_filter_enabled(&mut self, enabled: bool);

    /// Leave the terminal in a clean state
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Rate-limited Y-axis autoscaling
#[derive(Debug, Clone)]
pub struct AutoScale {
    interval: Duration,
    last_update: Option<Instant>,
    range: (f32, f32),
}

impl AutoScale {
    pub fn new(interval: Duration, initial: (f32, f32)) -> Self {
        Self {
            interval,
            last_update: None,
            range: initial,
        }
    }

    pub fn range(&self) -> (f32, f32) {
        self.range
    }

    /// Recompute the range if enough time has passed; returns true on change
    pub fn update(&mut self, series: &[f32], now: Instant) -> bool {
        if series.len() <= AUTOSCALE_MIN_POINTS {
            return false;
        }
        if let Some(last) = self.last_update {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }

        let min = series.iter().fold(f32::INFINITY, |a, &b| a.min(b));
        let max = series.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
        let span = max - min;
        let pad = if span > 0.0 { 0.15 * span } else { 0.2 };

        self.last_update = Some(now);
        let range = (min - pad, max + pad);
        let changed = range != self.range;
        self.range = range;
        changed
    }
}

/// Y axis: fixed or autoscaled
#[derive(Debug, Clone)]
pub enum Scale {
    Fixed(f32, f32),
    Auto(AutoScale),
}

impl Scale {
    pub fn from_config(config: &DisplayConfig) -> Self {
        match config.y_range {
            Some([low, high]) => Scale::Fixed(low, high),
            None => Scale::Auto(AutoScale::new(
                Duration::from_millis(config.autoscale_interval_ms),
                (0.0, 3.3),
            )),
        }
    }

    pub fn range(&mut self, series: &[f32], now: Instant) -> (f32, f32) {
        match self {
            Scale::Fixed(low, high) => (*low, *high),
            Scale::Auto(auto) => {
                auto.update(series, now);
                auto.range()
            }
        }
    }
}

/// Render `series` as a sparkline of at most `width` characters.
///
/// Longer series are bucketed and each bucket shows its maximum, so narrow
/// R peaks stay visible.
pub fn sparkline(series: &[f32], width: usize, low: f32, high: f32) -> String {
    if series.is_empty() || width == 0 {
        return String::new();
    }

    let buckets = width.min(series.len());
    let span = high - low;
    let top = (SPARK_LEVELS.len() - 1) as f32;

    (0..buckets)
        .map(|bucket| {
            let start = bucket * series.len() / buckets;
            let end = ((bucket + 1) * series.len() / buckets).max(start + 1);
            let value = series[start..end]
                .iter()
                .fold(f32::NEG_INFINITY, |a, &b| a.max(b));

            let level = if span > 0.0 {
                ((value - low) / span * top).round().clamp(0.0, top) as usize
            } else {
                0
            };
            SPARK_LEVELS[level]
        })
        .collect()
}

fn format_bpm(bpm: Option<HeartRate>) -> String {
    bpm.map(|hr| format!("{:5.1}", hr.bpm()))
        .unwrap_or_else(|| " --.-".to_string())
}

/// Single status line redrawn in place
pub struct TerminalDisplay<W: Write> {
    out: W,
    mode: DisplayMode,
    scale: Scale,
    width: usize,
    filter_enabled: bool,
    last_len: usize,
}

impl<W: Write> TerminalDisplay<W> {
    pub fn new(out: W, config: &DisplayConfig) -> Self {
        Self {
            out,
            mode: config.mode,
            scale: Scale::from_config(config),
            width: config.width.max(1),
            filter_enabled: true,
            last_len: 0,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Status line for the given state, without control characters
    pub fn render(&mut self, series: &[f32], bpm: Option<HeartRate>, now: Instant) -> String {
        let filter = if self.filter_enabled { "on" } else { "off" };

        match self.mode {
            DisplayMode::Waveform => {
                let (low, high) = self.scale.range(series, now);
                format!(
                    "{} [{:.2}..{:.2} V] BPM {} | filter {}",
                    sparkline(series, self.width, low, high),
                    low,
                    high,
                    format_bpm(bpm),
                    filter
                )
            }
            DisplayMode::Numeric => {
                let latest = series
                    .last()
                    .map(|v| format!("{:.3} V", v))
                    .unwrap_or_else(|| "--- V".to_string());
                format!("{} | BPM {} | filter {}", latest, format_bpm(bpm), filter)
            }
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SignalDisplay for TerminalDisplay<W> {
    fn update(&mut self, series: &[f32], bpm: Option<HeartRate>) -> io::Result<()> {
        let line = self.render(series, bpm, Instant::now());
        let len = line.chars().count();
        // Pad over leftovers of a longer previous line
        let padding = self.last_len.saturating_sub(len);
        write!(self.out, "\r{}{}", line, " ".repeat(padding))?;
        self.last_len = len;
        self.out.flush()
    }

    fn set_mode(&mut self, mode: DisplayMode) {
        self.mode = mode;
    }

    fn set_filter_enabled(&mut self, enabled: bool) {
        self.filter_enabled = enabled;
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.last_len > 0 {
            writeln!(self.out)?;
            self.last_len = 0;
        }
        self.out.flush()
    }
}
