//! Reason codes for cycle outcomes and loop transitions

use serde::{Deserialize, Serialize};

/// Reason codes attached to every cycle output and loop exit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // R1xx: Cycle outcomes
    // =========================================================================
    /// Full pipeline ran, score and profile emitted
    R101_CYCLE_ANALYZED,
    /// Landmark detector failed this cycle
    R102_LANDMARKS_UNAVAILABLE,
    /// Emotion classifier failed this cycle
    R103_EMOTION_UNAVAILABLE,

    // =========================================================================
    // R2xx: Validation and classification
    // =========================================================================
    /// Derived features did not form a valid sample
    R201_FEATURES_INVALID,
    /// Classifier returned a label outside the closed set
    R202_EMOTION_LABEL_UNRECOGNIZED,

    // =========================================================================
    // R3xx: Loop lifecycle
    // =========================================================================
    /// Capture source could not produce a frame
    R301_CAPTURE_LOST,
    /// External stop signal observed
    R302_STOP_REQUESTED,
    /// Configured cycle limit reached
    R303_CYCLE_LIMIT,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::R101_CYCLE_ANALYZED => "R101_CYCLE_ANALYZED",
            Self::R102_LANDMARKS_UNAVAILABLE => "R102_LANDMARKS_UNAVAILABLE",
            Self::R103_EMOTION_UNAVAILABLE => "R103_EMOTION_UNAVAILABLE",
            Self::R201_FEATURES_INVALID => "R201_FEATURES_INVALID",
            Self::R202_EMOTION_LABEL_UNRECOGNIZED => "R202_EMOTION_LABEL_UNRECOGNIZED",
            Self::R301_CAPTURE_LOST => "R301_CAPTURE_LOST",
            Self::R302_STOP_REQUESTED => "R302_STOP_REQUESTED",
            Self::R303_CYCLE_LIMIT => "R303_CYCLE_LIMIT",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::R101_CYCLE_ANALYZED => "Cycle analyzed",
            Self::R102_LANDMARKS_UNAVAILABLE => "No face landmarks this cycle",
            Self::R103_EMOTION_UNAVAILABLE => "No emotion classification this cycle",
            Self::R201_FEATURES_INVALID => "Derived features out of range",
            Self::R202_EMOTION_LABEL_UNRECOGNIZED => "Emotion label outside the known set",
            Self::R301_CAPTURE_LOST => "Capture source unavailable",
            Self::R302_STOP_REQUESTED => "Stop requested",
            Self::R303_CYCLE_LIMIT => "Cycle limit reached",
        }
    }

    /// Does this reason mark a degraded (placeholder) cycle?
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            Self::R102_LANDMARKS_UNAVAILABLE
                | Self::R103_EMOTION_UNAVAILABLE
                | Self::R201_FEATURES_INVALID
                | Self::R202_EMOTION_LABEL_UNRECOGNIZED
        )
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
