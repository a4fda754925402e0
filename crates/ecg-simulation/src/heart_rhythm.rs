//! Pre-defined heart rhythms for simulation

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Instantaneous heart rate as a function of time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeartRhythm {
    /// Constant rate
    Steady { bpm: f32 },
    /// Linear change, then hold at `end_bpm`
    Ramp {
        start_bpm: f32,
        end_bpm: f32,
        duration_secs: f32,
    },
    /// Periodic modulation around a mean, e.g. respiratory sinus arrhythmia
    Sinusoidal {
        mean_bpm: f32,
        depth_bpm: f32,
        period_secs: f32,
    },
}

impl HeartRhythm {
    /// Heart rate at `time` seconds, clamped to a simulatable band
    pub fn bpm_at_time(&self, time: f32) -> f32 {
        let bpm = match self {
            HeartRhythm::Steady { bpm } => *bpm,

            HeartRhythm::Ramp {
                start_bpm,
                end_bpm,
                duration_secs,
            } => {
                if time >= *duration_secs || *duration_secs <= 0.0 {
                    *end_bpm
                } else {
                    start_bpm + (end_bpm - start_bpm) * (time / duration_secs)
                }
            }

            HeartRhythm::Sinusoidal {
                mean_bpm,
                depth_bpm,
                period_secs,
            } => {
                if *period_secs <= 0.0 {
                    *mean_bpm
                } else {
                    mean_bpm + depth_bpm * (2.0 * PI * time / period_secs).sin()
                }
            }
        };

        bpm.clamp(20.0, 250.0)
    }

    /// True when every parameter is a finite number
    pub fn is_finite(&self) -> bool {
        match *self {
            HeartRhythm::Steady { bpm } => bpm.is_finite(),
            HeartRhythm::Ramp {
                start_bpm,
                end_bpm,
                duration_secs,
            } => start_bpm.is_finite() && end_bpm.is_finite() && duration_secs.is_finite(),
            HeartRhythm::Sinusoidal {
                mean_bpm,
                depth_bpm,
                period_secs,
            } => mean_bpm.is_finite() && depth_bpm.is_finite() && period_secs.is_finite(),
        }
    }

    /// Get rhythm description
    pub fn description(&self) -> &'static str {
        match self {
            HeartRhythm::Steady { .. } => "Steady rhythm",
            HeartRhythm::Ramp { .. } => "Gradual rate change",
            HeartRhythm::Sinusoidal { .. } => "Sinus arrhythmia",
        }
    }

    /// Common preset rhythms
    pub fn presets() -> Vec<(&'static str, HeartRhythm)> {
        vec![
            ("Resting", HeartRhythm::Steady { bpm: 62.0 }),
            ("Normal", HeartRhythm::Steady { bpm: 72.0 }),
            ("Tachycardia", HeartRhythm::Steady { bpm: 130.0 }),
            ("Exercise", HeartRhythm::Ramp {
                start_bpm: 70.0, end_bpm: 150.0, duration_secs: 60.0
            }),
            ("Recovery", HeartRhythm::Ramp {
                start_bpm: 150.0, end_bpm: 80.0, duration_secs: 90.0
            }),
            ("Breathing", HeartRhythm::Sinusoidal {
                mean_bpm: 70.0, depth_bpm: 6.0, period_secs: 5.0
            }),
        ]
    }

    /// Look up a preset by name, ignoring case
    pub fn preset(name: &str) -> Option<HeartRhythm> {
        Self::presets()
            .into_iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
            .map(|(_, rhythm)| rhythm)
    }
}

impl Default for HeartRhythm {
    fn default() -> Self {
        HeartRhythm::Steady { bpm: 72.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_rate() {
        let rhythm = HeartRhythm::Steady { bpm: 60.0 };
        assert_eq!(rhythm.bpm_at_time(0.0), 60.0);
        assert_eq!(rhythm.bpm_at_time(1000.0), 60.0);
    }

    #[test]
    fn test_ramp_interpolates_then_holds() {
        let rhythm = HeartRhythm::Ramp {
            start_bpm: 60.0,
            end_bpm: 120.0,
            duration_secs: 10.0,
        };
        assert_eq!(rhythm.bpm_at_time(0.0), 60.0);
        assert_eq!(rhythm.bpm_at_time(5.0), 90.0);
        assert_eq!(rhythm.bpm_at_time(10.0), 120.0);
        assert_eq!(rhythm.bpm_at_time(30.0), 120.0);
    }

    #[test]
    fn test_sinusoidal_stays_within_depth() {
        let rhythm = HeartRhythm::Sinusoidal {
            mean_bpm: 70.0,
            depth_bpm: 5.0,
            period_secs: 4.0,
        };
        for i in 0..400 {
            let bpm = rhythm.bpm_at_time(i as f32 * 0.01);
            assert!((65.0..=75.0).contains(&bpm));
        }
        assert!((rhythm.bpm_at_time(1.0) - 75.0).abs() < 1e-3);
    }

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(HeartRhythm::Steady { bpm: 0.0 }.bpm_at_time(0.0), 20.0);
        assert_eq!(HeartRhythm::Steady { bpm: 900.0 }.bpm_at_time(0.0), 250.0);
    }

    #[test]
    fn test_non_finite_parameters_are_detected() {
        assert!(HeartRhythm::default().is_finite());
        assert!(!HeartRhythm::Steady { bpm: f32::NAN }.is_finite());
        assert!(!HeartRhythm::Ramp {
            start_bpm: 60.0,
            end_bpm: f32::INFINITY,
            duration_secs: 10.0,
        }
        .is_finite());
        assert!(!HeartRhythm::Sinusoidal {
            mean_bpm: 70.0,
            depth_bpm: 5.0,
            period_secs: f32::NAN,
        }
        .is_finite());
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(
            HeartRhythm::preset("tachycardia"),
            Some(HeartRhythm::Steady { bpm: 130.0 })
        );
        assert_eq!(HeartRhythm::preset("BREATHING").map(|r| r.description()), Some("Sinus arrhythmia"));
        assert_eq!(HeartRhythm::preset("flatline"), None);
    }

    #[test]
    fn test_serde_tagged_form() {
        let json = serde_json::to_string(&HeartRhythm::Steady { bpm: 80.0 }).unwrap();
        assert_eq!(json, r#"{"kind":"steady","bpm":80.0}"#);

        let parsed: HeartRhythm = serde_json::from_str(
            r#"{"kind":"sinusoidal","mean_bpm":70.0,"depth_bpm":4.0,"period_secs":5.0}"#,
        )
        .unwrap();
        assert_eq!(parsed.description(), "Sinus arrhythmia");
    }

    #[test]
    fn test_presets_are_plausible() {
        for (name, rhythm) in HeartRhythm::presets() {
            assert!(rhythm.is_finite());
            let bpm = rhythm.bpm_at_time(0.0);
            assert!((30.0..=220.0).contains(&bpm), "{} starts at {}", name, bpm);
        }
    }
}
