//! Score, verdict tiers and contributing factors

use std::collections::BTreeSet;
use serde::{Deserialize, Serialize};

/// Verdict tiers, ordered by severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Score at or below the middle threshold
    Coherent,
    /// Score above the middle threshold
    CognitiveConflict,
    /// Score above the high threshold
    HighDeception,
}

impl Verdict {
    /// All tiers, lowest severity first
    pub const ALL: [Verdict; 3] = [
        Verdict::Coherent,
        Verdict::CognitiveConflict,
        Verdict::HighDeception,
    ];

    /// Wire label
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Coherent => "NEUTRAL / COHERENT",
            Verdict::CognitiveConflict => "COGNITIVE CONFLICT",
            Verdict::HighDeception => "HIGH DECEPTION / PANIC",
        }
    }

    /// Rationale shown next to the verdict
    pub fn mind_state(&self) -> &'static str {
        match self {
            Verdict::Coherent => {
                "Calm mind; answers are consistent with underlying thought (cognitive coherence)."
            }
            Verdict::CognitiveConflict => {
                "The brain is struggling to process information; the subject is uneasy or hesitant."
            }
            Verdict::HighDeception => {
                "Subconscious is in a defensive posture; truthfulness of the answers is questionable."
            }
        }
    }

    /// ANSI color name for terminal display
    pub fn color(&self) -> colored::Color {
        match self {
            Verdict::Coherent => colored::Color::Green,
            Verdict::CognitiveConflict => colored::Color::Yellow,
            Verdict::HighDeception => colored::Color::Red,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Pulse classification derived from the capped pulse term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PulseStatus {
    Normal,
    Elevated,
}

impl std::fmt::Display for PulseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PulseStatus::Normal => write!(f, "normal"),
            PulseStatus::Elevated => write!(f, "elevated"),
        }
    }
}

/// Facial-tension flags. Each fired flag contributes a fixed number of points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacialFlag {
    /// Brows drawn together (brow_dist below threshold)
    BrowFurrow,
    /// Narrowed or blinking eyes (eye_ratio below threshold)
    EyeNarrowing,
    /// Pressed lips (mouth_tension above threshold)
    MouthTension,
}

impl FacialFlag {
    /// Rationale sentence for the feedback string
    pub fn feedback(&self) -> &'static str {
        match self {
            FacialFlag::BrowFurrow => "Cognitive load detected.",
            FacialFlag::EyeNarrowing => "Possible avoidance behavior.",
            FacialFlag::MouthTension => "Speech suppression signs.",
        }
    }
}

/// Labels of features that pushed the score up
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    BrowFurrow,
    EyeNarrowing,
    MouthTension,
    ElevatedPulse,
    MotorTremor,
    TriggerInterval,
}

impl From<FacialFlag> for Factor {
    fn from(flag: FacialFlag) -> Self {
        match flag {
            FacialFlag::BrowFurrow => Factor::BrowFurrow,
            FacialFlag::EyeNarrowing => Factor::EyeNarrowing,
            FacialFlag::MouthTension => Factor::MouthTension,
        }
    }
}

/// Per-term breakdown of a score, before the trigger multiplier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTerms {
    pub pulse: f64,
    pub jitter: f64,
    pub facial: f64,
}

impl ScoreTerms {
    pub fn total(&self) -> f64 {
        self.pulse + self.jitter + self.facial
    }
}

/// Output of the scoring engine. `score` is always within [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub verdict: Verdict,
    pub contributing_factors: BTreeSet<Factor>,
    pub terms: ScoreTerms,
    pub pulse_status: PulseStatus,
    pub scientific_feedback: String,
}

impl ScoreResult {
    /// Score rounded to two decimals for the wire
    pub fn rounded_score(&self) -> f64 {
        (self.score * 100.0).round() / 100.0
    }

    pub fn mind_state(&self) -> &'static str {
        self.verdict.mind_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_ordering() {
        assert!(Verdict::Coherent < Verdict::CognitiveConflict);
        assert!(Verdict::CognitiveConflict < Verdict::HighDeception);
        let mut sorted = Verdict::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, Verdict::ALL.to_vec());
    }

    #[test]
    fn test_rounded_score() {
        let result = ScoreResult {
            score: 42.34567,
            verdict: Verdict::Coherent,
            contributing_factors: BTreeSet::new(),
            terms: ScoreTerms { pulse: 0.0, jitter: 0.0, facial: 0.0 },
            pulse_status: PulseStatus::Normal,
            scientific_feedback: String::new(),
        };
        assert_eq!(result.rounded_score(), 42.35);
    }

    #[test]
    fn test_factor_from_flag() {
        assert_eq!(Factor::from(FacialFlag::MouthTension), Factor::MouthTension);
    }
}
