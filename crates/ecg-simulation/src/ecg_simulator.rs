//! Single-lead ECG simulator producing PQRST beats at a configurable rhythm

use crate::heart_rhythm::HeartRhythm;
use ecg_core::{validate_sampling_rate, EcgError, EcgResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Full-scale voltage of a 3.3 V ADC front end
pub const ADC_FULL_SCALE_V: f32 = 3.3;

/// Time of the first R peak after the simulation starts, seconds
const FIRST_BEAT_SECS: f64 = 0.3;

/// One Gaussian component of the beat template, relative to the R peak
struct Wave {
    offset_secs: f32,
    amplitude_ratio: f32,
    width_secs: f32,
}

const PQRST: [Wave; 5] = [
    Wave { offset_secs: -0.16, amplitude_ratio: 0.10, width_secs: 0.025 },
    Wave { offset_secs: -0.02, amplitude_ratio: -0.10, width_secs: 0.008 },
    Wave { offset_secs: 0.0, amplitude_ratio: 1.0, width_secs: 0.010 },
    Wave { offset_secs: 0.025, amplitude_ratio: -0.15, width_secs: 0.008 },
    Wave { offset_secs: 0.25, amplitude_ratio: 0.25, width_secs: 0.040 },
];

/// Noise configuration for realistic ECG simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Gaussian noise standard deviation in volts (0.0 = no noise)
    pub gaussian_std: f32,
    /// Baseline wander amplitude in volts
    pub baseline_wander: f32,
    /// Baseline wander frequency (respiration), Hz
    pub wander_freq_hz: f32,
    /// Probability that an emitted line is corrupted (0.0 to 1.0)
    pub malformed_line_prob: f32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            gaussian_std: 0.01,
            baseline_wander: 0.05,
            wander_freq_hz: 0.25,
            malformed_line_prob: 0.0,
        }
    }
}

impl NoiseConfig {
    /// No noise, no wander, no corrupted lines
    pub fn none() -> Self {
        Self {
            gaussian_std: 0.0,
            baseline_wander: 0.0,
            wander_freq_hz: 0.0,
            malformed_line_prob: 0.0,
        }
    }
}

/// Configuration for ECG simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcgSimConfig {
    /// Sampling rate in Hz
    pub sampling_rate_hz: u32,
    /// Heart rhythm to generate
    pub rhythm: HeartRhythm,
    /// Isoelectric level in volts
    pub baseline_v: f32,
    /// R-wave height above baseline in volts
    pub r_amplitude_v: f32,
    /// Noise configuration
    pub noise: NoiseConfig,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for EcgSimConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 200,
            rhythm: HeartRhythm::default(),
            baseline_v: 1.2,
            r_amplitude_v: 1.0,
            noise: NoiseConfig::default(),
            seed: None,
        }
    }
}

impl EcgSimConfig {
    /// Steady rhythm at `bpm`
    pub fn steady(sampling_rate_hz: u32, bpm: f32) -> Self {
        Self {
            sampling_rate_hz,
            rhythm: HeartRhythm::Steady { bpm },
            ..Default::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_noise(mut self, noise: NoiseConfig) -> Self {
        self.noise = noise;
        self
    }

    pub fn validate(&self) -> EcgResult<()> {
        validate_sampling_rate(self.sampling_rate_hz)?;

        if !self.rhythm.is_finite() {
            return Err(EcgError::SimulationError {
                message: format!("Rhythm parameters must be finite: {:?}", self.rhythm),
            });
        }

        let noise = &self.noise;
        if !(noise.gaussian_std.is_finite() && noise.gaussian_std >= 0.0) {
            return Err(EcgError::SimulationError {
                message: format!(
                    "Noise standard deviation must be finite and non-negative, got {}",
                    noise.gaussian_std
                ),
            });
        }

        if !(noise.baseline_wander.is_finite() && noise.wander_freq_hz.is_finite()) {
            return Err(EcgError::SimulationError {
                message: "Baseline wander parameters must be finite".to_string(),
            });
        }

        if !(0.0..=1.0).contains(&self.noise.malformed_line_prob) {
            return Err(EcgError::SimulationError {
                message: format!(
                    "Malformed line probability must be within [0, 1], got {}",
                    self.noise.malformed_line_prob
                ),
            });
        }

        Ok(())
    }
}

/// ECG signal simulator
pub struct EcgSimulator {
    config: EcgSimConfig,
    rng: StdRng,
    normal_dist: Normal<f32>,
    samples_generated: u64,
    beats_generated: u64,
    previous_beat_secs: f64,
    next_beat_secs: f64,
}

impl EcgSimulator {
    /// Create new ECG simulator with configuration
    pub fn new(config: EcgSimConfig) -> EcgResult<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs()
        });

        let rng = StdRng::seed_from_u64(seed);
        let normal_dist = Normal::new(0.0, config.noise.gaussian_std).map_err(|e| {
            EcgError::SimulationError {
                message: format!("Failed to create normal distribution: {}", e),
            }
        })?;

        let first_interval = 60.0 / config.rhythm.bpm_at_time(0.0) as f64;

        Ok(EcgSimulator {
            config,
            rng,
            normal_dist,
            samples_generated: 0,
            beats_generated: 0,
            previous_beat_secs: FIRST_BEAT_SECS - first_interval,
            next_beat_secs: FIRST_BEAT_SECS,
        })
    }

    /// Generate the next sample in volts
    pub fn next_sample(&mut self) -> f32 {
        let time = self.elapsed_secs();

        while time >= self.next_beat_secs {
            self.previous_beat_secs = self.next_beat_secs;
            let bpm = self.config.rhythm.bpm_at_time(self.next_beat_secs as f32);
            self.next_beat_secs += 60.0 / bpm as f64;
            self.beats_generated += 1;
        }

        let since_previous = (time - self.previous_beat_secs) as f32;
        let until_next = (time - self.next_beat_secs) as f32;

        let mut value = self.config.baseline_v
            + self.beat_waveform(since_previous)
            + self.beat_waveform(until_next);

        value += self.add_noise(time as f32);

        self.samples_generated += 1;
        value.clamp(0.0, ADC_FULL_SCALE_V)
    }

    /// Generate `count` consecutive samples
    pub fn generate(&mut self, count: usize) -> Vec<f32> {
        (0..count).map(|_| self.next_sample()).collect()
    }

    /// Next line as a device would print it; occasionally corrupted
    pub fn next_line(&mut self) -> String {
        let sample = self.next_sample();
        let prob = self.config.noise.malformed_line_prob;

        if prob > 0.0 && self.rng.gen::<f32>() < prob {
            self.malformed_line(sample)
        } else {
            format_sample(sample)
        }
    }

    /// Sum of PQRST components at `offset` seconds from an R peak
    fn beat_waveform(&self, offset: f32) -> f32 {
        PQRST
            .iter()
            .map(|wave| {
                let z = (offset - wave.offset_secs) / wave.width_secs;
                wave.amplitude_ratio * (-0.5 * z * z).exp()
            })
            .sum::<f32>()
            * self.config.r_amplitude_v
    }

    fn add_noise(&mut self, time: f32) -> f32 {
        let mut noise = self.normal_dist.sample(&mut self.rng);

        // Respiration-driven baseline wander
        noise += self.config.noise.baseline_wander
            * (2.0 * PI * self.config.noise.wander_freq_hz * time).sin();

        noise
    }

    fn malformed_line(&mut self, sample: f32) -> String {
        match self.rng.gen_range(0..4) {
            0 => String::new(),
            1 => "ovf".to_string(),
            2 => format!("{:.2}-", sample),
            _ => "nan".to_string(),
        }
    }

    /// Simulated time of the next sample, seconds
    pub fn elapsed_secs(&self) -> f64 {
        self.samples_generated as f64 / self.config.sampling_rate_hz as f64
    }

    /// Instantaneous rate of the configured rhythm at the current time
    pub fn current_bpm(&self) -> f32 {
        self.config.rhythm.bpm_at_time(self.elapsed_secs() as f32)
    }

    pub fn samples_generated(&self) -> u64 {
        self.samples_generated
    }

    pub fn beats_generated(&self) -> u64 {
        self.beats_generated
    }

    /// Get current configuration
    pub fn config(&self) -> &EcgSimConfig {
        &self.config
    }
}

/// Format a sample the way the acquisition firmware prints it
pub fn format_sample(volts: f32) -> String {
    format!("{:.3}", volts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecg_core::parse_sample;

    fn noiseless(fs: u32, bpm: f32) -> EcgSimulator {
        let config = EcgSimConfig::steady(fs, bpm).with_noise(NoiseConfig::none()).with_seed(1);
        EcgSimulator::new(config).unwrap()
    }

    #[test]
    fn test_same_seed_same_signal() {
        let config = EcgSimConfig::steady(200, 75.0).with_seed(42);
        let a = EcgSimulator::new(config.clone()).unwrap().generate(500);
        let b = EcgSimulator::new(config).unwrap().generate(500);
        assert_eq!(a, b);
    }

    #[test]
    fn test_r_peaks_land_on_schedule() {
        // 120 BPM at 200 Hz: first R at sample 60, then every 100 samples
        let mut simulator = noiseless(200, 120.0);
        let signal = simulator.generate(1000);

        for (block, chunk) in signal.chunks(100).enumerate() {
            let argmax = chunk
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i)
                .unwrap();
            assert_eq!(argmax, 60, "block {}", block);
        }

        let peak = signal.iter().fold(f32::MIN, |a, &b| a.max(b));
        assert!((peak - 2.2).abs() < 0.05, "R peak at {}", peak);
    }

    #[test]
    fn test_beat_count_follows_rate() {
        let mut simulator = noiseless(200, 60.0);
        simulator.generate(2000);
        assert_eq!(simulator.beats_generated(), 10);
        assert!((simulator.elapsed_secs() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_samples_stay_within_adc_range() {
        let mut config = EcgSimConfig::steady(250, 90.0).with_seed(3);
        config.noise.gaussian_std = 0.5;
        config.baseline_v = 3.0;
        let mut simulator = EcgSimulator::new(config).unwrap();

        for x in simulator.generate(2500) {
            assert!((0.0..=ADC_FULL_SCALE_V).contains(&x));
        }
    }

    #[test]
    fn test_malformed_lines_are_rejected_by_parser() {
        let mut config = EcgSimConfig::steady(200, 72.0).with_seed(9);
        config.noise.malformed_line_prob = 1.0;
        let mut simulator = EcgSimulator::new(config).unwrap();
        for _ in 0..100 {
            let line = simulator.next_line();
            assert!(parse_sample(&line).is_err(), "{:?} parsed", line);
        }

        let mut clean = noiseless(200, 72.0);
        for _ in 0..100 {
            assert!(parse_sample(&clean.next_line()).is_ok());
        }
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(EcgSimulator::new(EcgSimConfig::steady(10, 72.0)).is_err());

        let mut config = EcgSimConfig::default();
        config.noise.gaussian_std = -1.0;
        assert!(matches!(
            EcgSimulator::new(config),
            Err(EcgError::SimulationError { .. })
        ));

        let mut config = EcgSimConfig::default();
        config.noise.malformed_line_prob = 1.5;
        assert!(EcgSimulator::new(config).is_err());
    }

    #[test]
    fn test_non_finite_parameters_are_rejected() {
        let mut config = EcgSimConfig::default();
        config.noise.gaussian_std = -1.0;
        assert!(matches!(config.validate(), Err(EcgError::SimulationError { .. })));

        config.noise.gaussian_std = f32::INFINITY;
        assert!(matches!(config.validate(), Err(EcgError::SimulationError { .. })));

        let mut config = EcgSimConfig::default();
        config.noise.wander_freq_hz = f32::NAN;
        assert!(config.validate().is_err());

        let config = EcgSimConfig::steady(200, f32::NAN);
        assert!(matches!(
            EcgSimulator::new(config),
            Err(EcgError::SimulationError { .. })
        ));
    }

    #[test]
    fn test_format_sample() {
        assert_eq!(format_sample(1.23456), "1.235");
        assert_eq!(format_sample(0.0), "0.000");
    }
}
