//! Scoring constant tables and loop tunables
//!
//! Two weightings are available as named profiles. `Extended` is the
//! default. Any field can be overridden from a JSON file on top of the
//! chosen profile.

use std::path::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use crate::error::{Error, Result};

/// Named constant tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Five-term table with mouth tension
    #[default]
    Extended,
    /// Brow/eye only table
    Compact,
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Profile::Extended => write!(f, "extended"),
            Profile::Compact => write!(f, "compact"),
        }
    }
}

/// Weights, caps and thresholds for the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub profile: Profile,
    /// K_pulse
    pub pulse_gain: f64,
    pub pulse_cap: f64,
    /// K_jitter
    pub jitter_gain: f64,
    pub jitter_cap: f64,
    /// Brow flag fires when brow_dist is below this
    pub brow_threshold: f64,
    pub brow_points: f64,
    /// Eye flag fires when eye_ratio is below this
    pub eye_threshold: f64,
    pub eye_points: f64,
    /// Mouth flag fires when mouth_tension is above this; `None` disables it
    pub mouth_threshold: Option<f64>,
    pub mouth_points: f64,
    pub facial_cap: f64,
    pub trigger_multiplier: f64,
    /// Strictly above: highest tier
    pub high_threshold: f64,
    /// Strictly above: middle tier
    pub mid_threshold: f64,
    /// pulse_term above this reports `elevated`
    pub pulse_elevated_threshold: f64,
    /// jitter_term above this reports motor tremor
    pub jitter_factor_threshold: f64,
}

impl ScoringConfig {
    pub fn extended() -> Self {
        Self {
            profile: Profile::Extended,
            pulse_gain: 10.0,
            pulse_cap: 35.0,
            jitter_gain: 12.0,
            jitter_cap: 30.0,
            brow_threshold: 0.15,
            brow_points: 25.0,
            eye_threshold: 0.10,
            eye_points: 20.0,
            mouth_threshold: Some(0.4),
            mouth_points: 20.0,
            facial_cap: 65.0,
            trigger_multiplier: 1.3,
            high_threshold: 80.0,
            mid_threshold: 50.0,
            pulse_elevated_threshold: 20.0,
            jitter_factor_threshold: 5.0,
        }
    }

    pub fn compact() -> Self {
        Self {
            profile: Profile::Compact,
            pulse_gain: 8.0,
            pulse_cap: 30.0,
            jitter_gain: 15.0,
            jitter_cap: 35.0,
            brow_threshold: 0.18,
            brow_points: 17.5,
            eye_threshold: 0.12,
            eye_points: 17.5,
            mouth_threshold: None,
            mouth_points: 0.0,
            facial_cap: 35.0,
            trigger_multiplier: 1.2,
            high_threshold: 75.0,
            mid_threshold: 45.0,
            pulse_elevated_threshold: 20.0,
            jitter_factor_threshold: 5.0,
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Extended => Self::extended(),
            Profile::Compact => Self::compact(),
        }
    }

    /// Check the invariants the scoring engine relies on
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("pulse_gain", self.pulse_gain),
            ("pulse_cap", self.pulse_cap),
            ("jitter_gain", self.jitter_gain),
            ("jitter_cap", self.jitter_cap),
            ("brow_threshold", self.brow_threshold),
            ("brow_points", self.brow_points),
            ("eye_threshold", self.eye_threshold),
            ("eye_points", self.eye_points),
            ("mouth_points", self.mouth_points),
            ("facial_cap", self.facial_cap),
            ("pulse_elevated_threshold", self.pulse_elevated_threshold),
            ("jitter_factor_threshold", self.jitter_factor_threshold),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!("{} must be a finite non-negative number, got {}", name, value)));
            }
        }
        if let Some(t) = self.mouth_threshold {
            if !t.is_finite() || !(0.0..=1.0).contains(&t) {
                return Err(Error::Config(format!("mouth_threshold must be within [0, 1], got {}", t)));
            }
        }
        if !self.trigger_multiplier.is_finite() || self.trigger_multiplier < 1.0 {
            return Err(Error::Config(format!(
                "trigger_multiplier must be >= 1, got {}",
                self.trigger_multiplier
            )));
        }
        let ordered = self.mid_threshold.is_finite()
            && self.high_threshold.is_finite()
            && 0.0 <= self.mid_threshold
            && self.mid_threshold < self.high_threshold
            && self.high_threshold <= 100.0;
        if !ordered {
            return Err(Error::Config(format!(
                "verdict thresholds must satisfy 0 <= mid < high <= 100, got mid={} high={}",
                self.mid_threshold, self.high_threshold
            )));
        }
        Ok(())
    }

    /// SHA-256 of the canonical JSON form, hex encoded
    pub fn fingerprint(&self) -> String {
        // Struct field order is fixed, so the serialization is canonical.
        let json = serde_json::to_vec(self).unwrap_or_default();
        let digest: [u8; 32] = Sha256::digest(&json).into();
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self::extended()
    }
}

/// Tunables for the real-time loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Cycles averaged into the jitter baseline
    pub calibration_cycles: usize,
    /// Tracked positions kept for the current jitter
    pub jitter_window: usize,
    /// Frames kept for the pulse proxy
    pub pulse_window: usize,
    /// Green-channel deviation to pulse proxy scale. Frames report mean green
    /// in [0, 1]; 255 puts the proxy in 8-bit intensity units.
    pub pulse_gain: f64,
    /// Jitter to movement score scale
    pub movement_gain: f64,
    /// Pause between cycles
    pub cycle_interval_ms: u64,
    /// Stop after this many cycles
    pub max_cycles: Option<u64>,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            calibration_cycles: 10,
            jitter_window: 5,
            pulse_window: 30,
            pulse_gain: 255.0,
            movement_gain: 20.0,
            cycle_interval_ms: 100,
            max_cycles: None,
        }
    }
}

impl RealtimeConfig {
    pub fn validate(&self) -> Result<()> {
        if self.jitter_window < 2 {
            return Err(Error::Config("jitter_window must be at least 2".into()));
        }
        if self.pulse_window < 2 {
            return Err(Error::Config("pulse_window must be at least 2".into()));
        }
        for (name, value) in [("pulse_gain", self.pulse_gain), ("movement_gain", self.movement_gain)] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!("{} must be a finite non-negative number, got {}", name, value)));
            }
        }
        Ok(())
    }
}

/// Root of the configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub scoring: ScoringConfig,
    pub realtime: RealtimeConfig,
}

impl Config {
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            scoring: ScoringConfig::for_profile(profile),
            realtime: RealtimeConfig::default(),
        }
    }

    /// Apply a JSON document on top of a profile's defaults.
    ///
    /// `scoring.profile` in the document, if present, picks the base table.
    pub fn from_json_str(json: &str, profile: Profile) -> Result<Self> {
        let overrides: Value = serde_json::from_str(json)?;
        let profile = overrides
            .pointer("/scoring/profile")
            .cloned()
            .map(serde_json::from_value::<Profile>)
            .transpose()?
            .unwrap_or(profile);

        let mut merged = serde_json::to_value(Self::for_profile(profile))?;
        merge(&mut merged, overrides);
        let config: Config = serde_json::from_value(merged)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file; `None` yields the profile defaults
    pub fn load(path: Option<&Path>, profile: Profile) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let config = Self::from_json_str(&text, profile)?;
                tracing::info!(path = %path.display(), profile = %config.scoring.profile, "loaded configuration");
                Ok(config)
            }
            None => Ok(Self::for_profile(profile)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.scoring.validate()?;
        self.realtime.validate()
    }
}

/// Recursive object merge; non-object values replace
fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                merge(base.entry(key).or_insert(Value::Null), value);
            }
        }
        (base, value) => *base = value,
    }
}
