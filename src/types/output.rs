//! Per-cycle output records for rendering

use chrono::{DateTime, Utc};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use crate::types::{PersonalityProfile, ReasonCode, ScoreResult};

/// Placeholder text for a cycle without a usable signal
pub const PLACEHOLDER_TEXT: &str = "analyzing / no signal";

/// What one cycle produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CycleOutput {
    /// Full pipeline result
    Analyzed {
        cycle: u64,
        timestamp: DateTime<Utc>,
        result: ScoreResult,
        profile: PersonalityProfile,
        reason: ReasonCode,
    },
    /// Model inference failed; placeholder only
    Degraded {
        cycle: u64,
        timestamp: DateTime<Utc>,
        reason: ReasonCode,
        detail: String,
    },
}

impl CycleOutput {
    pub fn analyzed(cycle: u64, result: ScoreResult, profile: PersonalityProfile) -> Self {
        CycleOutput::Analyzed {
            cycle,
            timestamp: Utc::now(),
            result,
            profile,
            reason: ReasonCode::R101_CYCLE_ANALYZED,
        }
    }

    pub fn degraded(cycle: u64, reason: ReasonCode, detail: impl Into<String>) -> Self {
        CycleOutput::Degraded {
            cycle,
            timestamp: Utc::now(),
            reason,
            detail: detail.into(),
        }
    }

    pub fn cycle(&self) -> u64 {
        match self {
            CycleOutput::Analyzed { cycle, .. } | CycleOutput::Degraded { cycle, .. } => *cycle,
        }
    }

    pub fn reason(&self) -> ReasonCode {
        match self {
            CycleOutput::Analyzed { reason, .. } | CycleOutput::Degraded { reason, .. } => *reason,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, CycleOutput::Degraded { .. })
    }

    /// Score of an analyzed cycle
    pub fn score(&self) -> Option<f64> {
        match self {
            CycleOutput::Analyzed { result, .. } => Some(result.score),
            CycleOutput::Degraded { .. } => None,
        }
    }

    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        match self {
            CycleOutput::Analyzed { cycle, result, profile, .. } => {
                let head = format!(
                    "#{:<5} score={:>6.2} | {}",
                    cycle,
                    result.rounded_score(),
                    result.verdict
                );
                let traits = profile.short_string();
                format!(
                    "{} | pulse={} | {} | {}",
                    head.as_str().color(result.verdict.color()).bold(),
                    result.pulse_status,
                    profile.mental_state.label().cyan(),
                    traits.as_str().dimmed()
                )
            }
            CycleOutput::Degraded { cycle, reason, .. } => format!(
                "#{:<5} {} | {}",
                cycle,
                PLACEHOLDER_TEXT.yellow(),
                reason.code().dimmed()
            ),
        }
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        match self {
            CycleOutput::Analyzed { cycle, result, profile, reason, .. } => format!(
                "cycle={} | score={:.2} | verdict={} | pulse={} | mental_state={} | traits={} | reason={}",
                cycle,
                result.rounded_score(),
                result.verdict,
                result.pulse_status,
                profile.mental_state,
                profile.short_string(),
                reason.code()
            ),
            CycleOutput::Degraded { cycle, reason, .. } => format!(
                "cycle={} | {} | reason={}",
                cycle,
                PLACEHOLDER_TEXT,
                reason.code()
            ),
        }
    }
}
