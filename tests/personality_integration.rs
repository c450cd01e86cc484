//! Integration tests for personality inference
//!
//! Totality over the closed emotion set and the label boundary.

use pretty_assertions::assert_eq;

use psyscan::core::PersonalityInferencer;
use psyscan::types::{
    Emotion, EmotionClassification, MentalState, RawEmotion, Trait, TraitLevel,
};
use psyscan::Error;

const GRID: [f64; 3] = [0.0, 0.5, 1.0];

/// Every emotion on the gaze/movement grid yields all four traits
#[test]
fn test_every_emotion_and_grid_point_yields_full_profile() {
    let inferencer = PersonalityInferencer::new();
    for emotion in Emotion::ALL {
        for gaze in GRID {
            for movement in GRID {
                let profile = inferencer.infer(&EmotionClassification::new(emotion), gaze, movement);
                assert_eq!(profile.traits.len(), 4, "{} at gaze={} movement={}", emotion, gaze, movement);
                for tr in Trait::ALL {
                    assert!(profile.traits.contains_key(&tr));
                }
                assert!(!profile.verdict.is_empty());
            }
        }
    }
}

/// Mental state per emotion
#[test]
fn test_mental_state_per_emotion() {
    let inferencer = PersonalityInferencer::new();
    let expected = [
        (Emotion::Fear, MentalState::AcuteStress),
        (Emotion::Angry, MentalState::AcuteStress),
        (Emotion::Sad, MentalState::LowAffect),
        (Emotion::Happy, MentalState::Positive),
        (Emotion::Neutral, MentalState::Stable),
        (Emotion::Surprise, MentalState::Stable),
        (Emotion::Disgust, MentalState::Stable),
    ];
    for (emotion, state) in expected {
        let profile = inferencer.infer(&EmotionClassification::new(emotion), 0.5, 0.5);
        assert_eq!(profile.mental_state, state, "{}", emotion);
    }
}

/// Happy: extroversion follows movement
#[test]
fn test_happy_grid_extroversion() {
    let inferencer = PersonalityInferencer::new();
    let happy = EmotionClassification::new(Emotion::Happy);
    let levels: Vec<TraitLevel> = GRID
        .iter()
        .map(|m| inferencer.infer(&happy, 0.0, *m).level(Trait::Extroversion))
        .collect();
    assert_eq!(levels, vec![TraitLevel::Low, TraitLevel::Low, TraitLevel::High]);
}

/// Neutral: conscientiousness follows gaze
#[test]
fn test_neutral_grid_conscientiousness() {
    let inferencer = PersonalityInferencer::new();
    let neutral = EmotionClassification::new(Emotion::Neutral);
    let levels: Vec<TraitLevel> = GRID
        .iter()
        .map(|g| inferencer.infer(&neutral, *g, 0.0).level(Trait::Conscientiousness))
        .collect();
    assert_eq!(levels, vec![TraitLevel::Moderate, TraitLevel::Moderate, TraitLevel::High]);
}

/// Raw labels are trimmed and case-insensitive
#[test]
fn test_raw_labels_are_case_insensitive() {
    let inferencer = PersonalityInferencer::new();
    let profile = inferencer.infer_raw(RawEmotion::new(" Fear "), 0.5, 0.5).unwrap();
    assert_eq!(profile.level(Trait::Neuroticism), TraitLevel::High);
}

/// An unknown label in the score map is rejected too
#[test]
fn test_unknown_scored_label_is_rejected() {
    let inferencer = PersonalityInferencer::new();
    let mut raw = RawEmotion::new("happy");
    raw.scores.insert("happy".into(), 0.8);
    raw.scores.insert("bored".into(), 0.1);
    let err = inferencer.infer_raw(raw, 0.5, 0.5).unwrap_err();
    assert!(matches!(err, Error::UnrecognizedEmotionLabel(label) if label == "bored"));
}
