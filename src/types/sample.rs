//! Per-cycle biometric measurement snapshot

use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};

/// Input modality reported by the client. Passthrough only: it does not
/// select a different extraction path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Mouse,
    Camera,
    Heartbeat,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Mode::Mouse => "mouse",
            Mode::Camera => "camera",
            Mode::Heartbeat => "heartbeat",
        };
        write!(f, "{}", name)
    }
}

/// One measurement cycle. Fields are private so every instance has passed
/// `BioSignalSample::new`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BioSignalSample {
    baseline_jitter: f64,
    current_jitter: f64,
    brow_dist: f64,
    eye_ratio: f64,
    mouth_tension: f64,
    pulse_val: f64,
    is_triggered: bool,
}

impl BioSignalSample {
    /// Build a sample, rejecting non-finite values, negative jitter/pulse
    /// and geometric ratios outside [0, 1].
    pub fn new(
        baseline_jitter: f64,
        current_jitter: f64,
        brow_dist: f64,
        eye_ratio: f64,
        mouth_tension: f64,
        pulse_val: f64,
        is_triggered: bool,
    ) -> Result<Self> {
        let mut fields = Vec::new();

        let non_negative = [
            ("baseline_jitter", baseline_jitter),
            ("current_jitter", current_jitter),
            ("pulse_val", pulse_val),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                fields.push(name.to_string());
            }
        }

        let ratios = [
            ("brow_dist", brow_dist),
            ("eye_ratio", eye_ratio),
            ("mouth_tension", mouth_tension),
        ];
        for (name, value) in ratios {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                fields.push(name.to_string());
            }
        }

        if !fields.is_empty() {
            return Err(Error::Validation { fields });
        }

        Ok(Self {
            baseline_jitter,
            current_jitter,
            brow_dist,
            eye_ratio,
            mouth_tension,
            pulse_val,
            is_triggered,
        })
    }

    pub fn baseline_jitter(&self) -> f64 {
        self.baseline_jitter
    }

    pub fn current_jitter(&self) -> f64 {
        self.current_jitter
    }

    pub fn brow_dist(&self) -> f64 {
        self.brow_dist
    }

    pub fn eye_ratio(&self) -> f64 {
        self.eye_ratio
    }

    pub fn mouth_tension(&self) -> f64 {
        self.mouth_tension
    }

    pub fn pulse_val(&self) -> f64 {
        self.pulse_val
    }

    pub fn is_triggered(&self) -> bool {
        self.is_triggered
    }

    /// Same sample with the trigger flag replaced
    pub fn with_trigger(self, is_triggered: bool) -> Self {
        Self { is_triggered, ..self }
    }
}
