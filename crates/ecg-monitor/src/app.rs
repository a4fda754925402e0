//! Monitor run loop and session statistics

use crate::config::MonitorConfig;
use crate::controller::{Command, Controller};
use crate::device::DeviceHandle;
use crate::display::SignalDisplay;
use chrono::{DateTime, Local};
use ecg_core::{parse_sample, HeartRate};
use ecg_processing::Pipeline;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// Period of the "is an analysis cycle due" check
const ANALYSIS_CHECK_PERIOD: Duration = Duration::from_millis(100);

/// Why the run loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    EndOfInput,
    Interrupted,
    Quit,
    DeviceFailure,
}

/// Valid and dropped line counts for one session
#[derive(Debug, Clone)]
pub struct SessionStats {
    started_at: DateTime<Local>,
    started: Instant,
    valid_lines: u64,
    dropped_lines: u64,
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            started: Instant::now(),
            valid_lines: 0,
            dropped_lines: 0,
        }
    }

    pub fn record_valid(&mut self) {
        self.valid_lines += 1;
    }

    pub fn record_dropped(&mut self) {
        self.dropped_lines += 1;
    }

    pub fn valid_lines(&self) -> u64 {
        self.valid_lines
    }

    pub fn dropped_lines(&self) -> u64 {
        self.dropped_lines
    }

    /// Valid samples per second over `elapsed`
    pub fn average_rate_hz(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs > 0.0 {
            self.valid_lines as f64 / secs
        } else {
            0.0
        }
    }

    pub fn summarize(&self, exit_reason: ExitReason, last_bpm: Option<HeartRate>, analysis_cycles: u64) -> SessionSummary {
        SessionSummary {
            started_at: self.started_at,
            ended_at: Local::now(),
            exit_reason,
            valid_lines: self.valid_lines,
            dropped_lines: self.dropped_lines,
            average_rate_hz: self.average_rate_hz(self.started.elapsed()),
            last_bpm,
            analysis_cycles,
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// End-of-session report
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub exit_reason: ExitReason,
    pub valid_lines: u64,
    pub dropped_lines: u64,
    pub average_rate_hz: f64,
    pub last_bpm: Option<HeartRate>,
    pub analysis_cycles: u64,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session summary")?;
        writeln!(f, "  started:        {}", self.started_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "  ended:          {}", self.ended_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "  valid lines:    {}", self.valid_lines)?;
        writeln!(f, "  dropped lines:  {}", self.dropped_lines)?;
        writeln!(f, "  average rate:   {:.1} Hz", self.average_rate_hz)?;
        match self.last_bpm {
            Some(bpm) => writeln!(f, "  last estimate:  {}", bpm)?,
            None => writeln!(f, "  last estimate:  none")?,
        }
        write!(f, "  analysis runs:  {}", self.analysis_cycles)
    }
}

/// Ties a device, the pipeline, the controller and a display together
pub struct Monitor<D: SignalDisplay> {
    pipeline: Pipeline,
    controller: Controller,
    display: D,
    stats: SessionStats,
    refresh_period: Duration,
}

impl<D: SignalDisplay> Monitor<D> {
    pub fn new(config: &MonitorConfig, pipeline: Pipeline, mut display: D) -> Self {
        let controller = Controller::new(config.display.mode);
        display.set_mode(controller.display_mode());
        display.set_filter_enabled(controller.filter_enabled());

        Self {
            pipeline,
            controller,
            display,
            stats: SessionStats::new(),
            refresh_period: Duration::from_millis(config.display.refresh_ms.max(1)),
        }
    }

    /// Parse and ingest one line; malformed lines are counted and skipped
    pub fn handle_line(&mut self, line: &str) {
        match parse_sample(line) {
            Ok(sample) => {
                self.pipeline.ingest(sample);
                self.stats.record_valid();
            }
            Err(e) => {
                self.stats.record_dropped();
                trace!(error = %e, "line dropped");
            }
        }
    }

    /// Apply a command; returns false when the session should end
    pub fn handle_command(&mut self, command: Command) -> bool {
        self.controller.handle(command);
        self.pipeline.set_filter_enabled(self.controller.filter_enabled());
        self.display.set_filter_enabled(self.controller.filter_enabled());
        self.display.set_mode(self.controller.display_mode());
        command != Command::Quit
    }

    /// Run an analysis cycle if one is due
    pub fn check_analysis(&mut self, now: Instant) {
        if let Some(report) = self.pipeline.poll(now) {
            match report.estimate {
                Some(bpm) => info!(
                    %bpm,
                    beat_interval_secs = bpm.beat_interval_secs(),
                    peaks = report.peaks.len(),
                    "heart rate updated"
                ),
                None => debug!(
                    peaks = report.peaks.len(),
                    peak_to_peak = report.signal.peak_to_peak,
                    "no plausible estimate, keeping previous value"
                ),
            }
        }
    }

    fn refresh_display(&mut self) {
        let series = self.pipeline.series();
        if let Err(e) = self.display.update(&series, self.pipeline.current_bpm()) {
            warn!(error = %e, "display update failed");
        }
    }

    /// Run until the input ends, a quit command, Ctrl-C or a device error.
    ///
    /// The device is closed before returning on every path.
    pub async fn run(
        &mut self,
        device: &mut DeviceHandle,
        mut commands: mpsc::Receiver<Command>,
    ) -> SessionSummary {
        let mut analysis_timer = interval(ANALYSIS_CHECK_PERIOD);
        analysis_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut refresh_timer = interval(self.refresh_period);
        refresh_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut commands_open = true;

        info!(device = device.name(), "monitoring started");

        let exit_reason = loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("interrupt received, shutting down");
                    break ExitReason::Interrupted;
                }

                line = device.next_line() => match line {
                    Some(Ok(line)) => self.handle_line(&line),
                    Some(Err(e)) => {
                        error!(error = %e, "device read failed");
                        break ExitReason::DeviceFailure;
                    }
                    None => {
                        info!("input ended");
                        break ExitReason::EndOfInput;
                    }
                },

                _ = analysis_timer.tick() => self.check_analysis(Instant::now()),

                _ = refresh_timer.tick() => self.refresh_display(),

                command = commands.recv(), if commands_open => match command {
                    Some(command) => {
                        if !self.handle_command(command) {
                            break ExitReason::Quit;
                        }
                    }
                    None => commands_open = false,
                },
            }
        };

        device.close();
        self.refresh_display();
        if let Err(e) = self.display.finish() {
            warn!(error = %e, "failed to restore terminal line");
        }

        self.summary(exit_reason)
    }

    pub fn summary(&self, exit_reason: ExitReason) -> SessionSummary {
        self.stats.summarize(
            exit_reason,
            self.pipeline.current_bpm(),
            self.pipeline.metrics().cycles,
        )
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::InputDevice;
    use crate::display::{DisplayMode, TerminalDisplay};
    use ecg_simulation::{EcgSimConfig, LineStreamConfig, NoiseConfig};

    fn monitor() -> Monitor<TerminalDisplay<Vec<u8>>> {
        let config = MonitorConfig::default();
        let pipeline = Pipeline::new(config.processing.clone()).unwrap();
        let display = TerminalDisplay::new(Vec::new(), &config.display);
        Monitor::new(&config, pipeline, display)
    }

    #[test]
    fn test_malformed_lines_are_counted_not_fatal() {
        let mut monitor = monitor();
        for line in ["1.0", "", "abc", "1.1", "nan", "1.2.3", "0.9"] {
            monitor.handle_line(line);
        }

        assert_eq!(monitor.stats().valid_lines(), 3);
        assert_eq!(monitor.stats().dropped_lines(), 4);
        assert_eq!(monitor.pipeline().samples_ingested(), 3);
    }

    #[test]
    fn test_commands_reach_pipeline_and_display() {
        let mut monitor = monitor();
        assert!(monitor.pipeline().filter_enabled());

        assert!(monitor.handle_command(Command::ToggleFilter));
        assert!(!monitor.pipeline().filter_enabled());

        assert!(monitor.handle_command(Command::ToggleDisplayMode));
        assert_eq!(monitor.display().mode(), DisplayMode::Numeric);

        assert!(!monitor.handle_command(Command::Quit));
    }

    #[test]
    fn test_average_rate() {
        let mut stats = SessionStats::new();
        for _ in 0..400 {
            stats.record_valid();
        }
        stats.record_dropped();
        assert_eq!(stats.average_rate_hz(Duration::from_secs(2)), 200.0);
        assert_eq!(stats.average_rate_hz(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_summary_report() {
        let mut monitor = monitor();
        monitor.handle_line("1.0");
        monitor.handle_line("x");

        let summary = monitor.summary(ExitReason::Interrupted);
        assert_eq!(summary.valid_lines, 1);
        assert_eq!(summary.dropped_lines, 1);
        assert_eq!(summary.last_bpm, None);

        let text = summary.to_string();
        assert!(text.contains("valid lines:    1"));
        assert!(text.contains("dropped lines:  1"));
        assert!(text.contains("last estimate:  none"));
    }

    #[tokio::test]
    async fn test_run_until_input_ends() {
        let mut signal = EcgSimConfig::steady(1000, 72.0).with_noise(NoiseConfig::none());
        signal.seed = Some(11);
        signal.noise.malformed_line_prob = 0.1;
        let stream = LineStreamConfig {
            tick_ms: 2,
            max_lines: Some(500),
            ..Default::default()
        };
        let mut device = InputDevice::Simulated { signal, stream }.open().unwrap();

        let mut monitor = monitor();
        let (_sender, commands) = mpsc::channel(4);
        let summary = monitor.run(&mut device, commands).await;

        assert_eq!(summary.exit_reason, ExitReason::EndOfInput);
        assert_eq!(summary.valid_lines + summary.dropped_lines, 500);
        assert!(summary.dropped_lines > 0);
        assert!(!device.is_open());
    }

    #[tokio::test]
    async fn test_quit_command_ends_session() {
        let signal = EcgSimConfig::steady(200, 72.0).with_seed(3);
        let mut device = InputDevice::Simulated {
            signal,
            stream: LineStreamConfig::default(),
        }
        .open()
        .unwrap();

        let mut monitor = monitor();
        let (sender, commands) = mpsc::channel(4);
        sender.send(Command::ToggleFilter).await.unwrap();
        sender.send(Command::Quit).await.unwrap();

        let summary = monitor.run(&mut device, commands).await;
        assert_eq!(summary.exit_reason, ExitReason::Quit);
        assert!(!monitor.pipeline().filter_enabled());
        assert!(!device.is_open());
    }
}
