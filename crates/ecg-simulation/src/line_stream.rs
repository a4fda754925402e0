//! Real-time line stream: paces simulator output like a serial device

use crate::ecg_simulator::EcgSimulator;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::debug;

/// Configuration for the paced line stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineStreamConfig {
    /// Timer period; each tick emits the lines that became due
    pub tick_ms: u64,
    /// Bounded channel capacity in lines
    pub channel_capacity: usize,
    /// Stop after this many lines (`None` = run until the receiver drops)
    pub max_lines: Option<u64>,
}

impl Default for LineStreamConfig {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            channel_capacity: 1024,
            max_lines: None,
        }
    }
}

/// Totals reported when the stream task ends
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineStreamStats {
    pub lines_sent: u64,
    pub beats_generated: u64,
}

/// Spawn the producer task; lines arrive on the returned receiver at the
/// simulator's sampling rate
pub fn spawn_line_stream(
    simulator: EcgSimulator,
    config: LineStreamConfig,
) -> (mpsc::Receiver<String>, JoinHandle<LineStreamStats>) {
    let (sender, receiver) = mpsc::channel(config.channel_capacity.max(1));
    let handle = tokio::spawn(run_line_stream(simulator, config, sender));
    (receiver, handle)
}

async fn run_line_stream(
    mut simulator: EcgSimulator,
    config: LineStreamConfig,
    sender: mpsc::Sender<String>,
) -> LineStreamStats {
    let tick_ms = config.tick_ms.max(1);
    let lines_per_tick =
        simulator.config().sampling_rate_hz as f64 * tick_ms as f64 / 1000.0;
    let mut timer = interval(Duration::from_millis(tick_ms));
    let mut stats = LineStreamStats::default();
    // Fractional lines carried between ticks
    let mut due = 0.0f64;

    debug!(
        sampling_rate_hz = simulator.config().sampling_rate_hz,
        rhythm = simulator.config().rhythm.description(),
        bpm = simulator.current_bpm(),
        tick_ms,
        "simulated line stream started"
    );

    loop {
        timer.tick().await;
        due += lines_per_tick;

        while due >= 1.0 {
            if config.max_lines.is_some_and(|max| stats.lines_sent >= max) {
                stats.beats_generated = simulator.beats_generated();
                debug!(
                    lines = stats.lines_sent,
                    samples = simulator.samples_generated(),
                    "simulated line stream finished"
                );
                return stats;
            }

            if sender.send(simulator.next_line()).await.is_err() {
                stats.beats_generated = simulator.beats_generated();
                debug!(lines = stats.lines_sent, "line receiver dropped, stopping stream");
                return stats;
            }

            stats.lines_sent += 1;
            due -= 1.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecg_simulator::{EcgSimConfig, NoiseConfig};
    use ecg_core::parse_sample;

    fn simulator() -> EcgSimulator {
        let config = EcgSimConfig::steady(200, 72.0)
            .with_noise(NoiseConfig::none())
            .with_seed(5);
        EcgSimulator::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_bounded_stream_delivers_every_line() {
        let config = LineStreamConfig {
            tick_ms: 5,
            max_lines: Some(50),
            ..Default::default()
        };
        let (mut receiver, handle) = spawn_line_stream(simulator(), config);

        let mut lines = Vec::new();
        while let Some(line) = receiver.recv().await {
            lines.push(line);
        }

        assert_eq!(lines.len(), 50);
        assert!(lines.iter().all(|line| parse_sample(line).is_ok()));

        let stats = handle.await.unwrap();
        assert_eq!(stats.lines_sent, 50);
    }

    #[tokio::test]
    async fn test_stream_matches_direct_generation() {
        let config = LineStreamConfig {
            tick_ms: 5,
            max_lines: Some(30),
            ..Default::default()
        };
        let (mut receiver, _handle) = spawn_line_stream(simulator(), config);

        let mut direct = simulator();
        while let Some(line) = receiver.recv().await {
            assert_eq!(line, direct.next_line());
        }
    }

    #[tokio::test]
    async fn test_stream_stops_when_receiver_dropped() {
        let (receiver, handle) = spawn_line_stream(simulator(), LineStreamConfig::default());
        drop(receiver);

        let stats = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("stream task should stop")
            .unwrap();
        assert_eq!(stats.lines_sent, 0);
    }
}
