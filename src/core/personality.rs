//! Personality inferencer: emotion + gaze/movement to trait levels
//!
//! Rules:
//! - fear, angry -> acute-stress/defensive, Neuroticism High
//! - sad         -> low-affect/depressive, Neuroticism High
//! - happy       -> positive/confident, Openness High,
//!                  Extroversion High if movement > 0.5 else Low
//! - otherwise   -> stable/focused,
//!                  Conscientiousness High if gaze > 0.7 else Moderate
//!
//! Traits not named by a rule stay Moderate.

use crate::error::Result;
use crate::types::{
    Emotion, EmotionClassification, MentalState, PersonalityProfile, RawEmotion, Trait, TraitLevel,
};

/// Movement above this reads as extroverted
pub const MOVEMENT_EXTROVERSION_THRESHOLD: f64 = 0.5;

/// Gaze above this reads as conscientious
pub const GAZE_CONSCIENTIOUSNESS_THRESHOLD: f64 = 0.7;

#[derive(Debug, Default, Clone, Copy)]
pub struct PersonalityInferencer;

impl PersonalityInferencer {
    pub fn new() -> Self {
        Self
    }

    /// Total over the closed emotion set
    pub fn infer(
        &self,
        classification: &EmotionClassification,
        gaze_score: f64,
        movement_score: f64,
    ) -> PersonalityProfile {
        match classification.dominant_emotion {
            Emotion::Fear | Emotion::Angry => {
                let mut profile = PersonalityProfile::moderate(MentalState::AcuteStress);
                profile.set(Trait::Neuroticism, TraitLevel::High);
                profile
            }
            Emotion::Sad => {
                let mut profile = PersonalityProfile::moderate(MentalState::LowAffect);
                profile.set(Trait::Neuroticism, TraitLevel::High);
                profile
            }
            Emotion::Happy => {
                let mut profile = PersonalityProfile::moderate(MentalState::Positive);
                profile.set(Trait::Openness, TraitLevel::High);
                let extroversion = if movement_score > MOVEMENT_EXTROVERSION_THRESHOLD {
                    TraitLevel::High
                } else {
                    TraitLevel::Low
                };
                profile.set(Trait::Extroversion, extroversion);
                profile
            }
            Emotion::Neutral | Emotion::Surprise | Emotion::Disgust => {
                let mut profile = PersonalityProfile::moderate(MentalState::Stable);
                if gaze_score > GAZE_CONSCIENTIOUSNESS_THRESHOLD {
                    profile.set(Trait::Conscientiousness, TraitLevel::High);
                }
                profile
            }
        }
    }

    /// Infer from untyped classifier output; unknown labels are an error
    pub fn infer_raw(&self, raw: RawEmotion, gaze_score: f64, movement_score: f64) -> Result<PersonalityProfile> {
        let classification = EmotionClassification::try_from(raw)?;
        Ok(self.infer(&classification, gaze_score, movement_score))
    }
}
