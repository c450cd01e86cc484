//! Scoring engine: weighted sum with per-term caps, trigger multiplier and
//! a final clamp to [0, 100], then verdict tiering by descending threshold.
//!
//! Order of operations:
//! 1. pulse  = min(pulse_val * pulse_gain, pulse_cap)
//! 2. jitter = min(|current - baseline| * jitter_gain, jitter_cap)
//! 3. facial = min(sum of fired flag points, facial_cap)
//! 4. total  = pulse + jitter + facial, times trigger_multiplier if triggered
//! 5. score  = min(total, 100)

use std::collections::BTreeSet;
use crate::config::ScoringConfig;
use crate::core::FeatureExtractor;
use crate::types::{BioSignalSample, Factor, PulseStatus, ScoreResult, ScoreTerms, Verdict};

/// Hard upper bound of every emitted score
pub const SCORE_MAX: f64 = 100.0;

/// Pure scoring over a fixed constant table
#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    config: ScoringConfig,
    features: FeatureExtractor,
}

impl ScoringEngine {
    /// Create an engine over a validated table
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            features: FeatureExtractor::new(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Capped terms before the trigger multiplier
    pub fn terms(&self, sample: &BioSignalSample) -> ScoreTerms {
        let cfg = &self.config;
        let pulse = (sample.pulse_val() * cfg.pulse_gain).min(cfg.pulse_cap);

        let jitter_magnitude = self
            .features
            .jitter_magnitude(sample.baseline_jitter(), sample.current_jitter());
        let jitter = (jitter_magnitude * cfg.jitter_gain).min(cfg.jitter_cap);

        let flags = self.features.facial_tension_flags(
            cfg,
            sample.brow_dist(),
            sample.eye_ratio(),
            sample.mouth_tension(),
        );
        let facial = flags
            .iter()
            .map(|f| self.features.flag_points(cfg, *f))
            .sum::<f64>()
            .min(cfg.facial_cap);

        ScoreTerms { pulse, jitter, facial }
    }

    /// Score one sample. Total for any validated sample.
    pub fn score(&self, sample: &BioSignalSample) -> ScoreResult {
        let cfg = &self.config;
        let terms = self.terms(sample);

        let mut raw_total = terms.total();
        if sample.is_triggered() {
            raw_total *= cfg.trigger_multiplier;
        }
        let score = raw_total.clamp(0.0, SCORE_MAX);

        let flags = self.features.facial_tension_flags(
            cfg,
            sample.brow_dist(),
            sample.eye_ratio(),
            sample.mouth_tension(),
        );
        let pulse_status = self.pulse_status(terms.pulse);

        let mut contributing_factors: BTreeSet<Factor> = flags.iter().copied().map(Factor::from).collect();
        if pulse_status == PulseStatus::Elevated {
            contributing_factors.insert(Factor::ElevatedPulse);
        }
        if terms.jitter > cfg.jitter_factor_threshold {
            contributing_factors.insert(Factor::MotorTremor);
        }
        if sample.is_triggered() {
            contributing_factors.insert(Factor::TriggerInterval);
        }

        let scientific_feedback = flags
            .iter()
            .map(|f| f.feedback())
            .collect::<Vec<_>>()
            .join(" ");

        ScoreResult {
            score,
            verdict: self.verdict(score),
            contributing_factors,
            terms,
            pulse_status,
            scientific_feedback,
        }
    }

    /// Tier for a score. Depends on the score alone.
    pub fn verdict(&self, score: f64) -> Verdict {
        if score > self.config.high_threshold {
            Verdict::HighDeception
        } else if score > self.config.mid_threshold {
            Verdict::CognitiveConflict
        } else {
            Verdict::Coherent
        }
    }

    pub fn pulse_status(&self, pulse_term: f64) -> PulseStatus {
        if pulse_term > self.config.pulse_elevated_threshold {
            PulseStatus::Elevated
        } else {
            PulseStatus::Normal
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
