//! Emotion labels produced by the external classifier

use std::collections::BTreeMap;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::Error;

/// Closed set of emotion labels understood by the personality inferencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Fear,
    Surprise,
    Disgust,
    Neutral,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fear,
        Emotion::Surprise,
        Emotion::Disgust,
        Emotion::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fear => "fear",
            Emotion::Surprise => "surprise",
            Emotion::Disgust => "disgust",
            Emotion::Neutral => "neutral",
        }
    }
}

impl FromStr for Emotion {
    type Err = Error;

    /// Case-insensitive; anything outside the closed set is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_lowercase();
        Emotion::ALL
            .into_iter()
            .find(|e| e.as_str() == label)
            .ok_or_else(|| Error::UnrecognizedEmotionLabel(s.to_string()))
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Untyped classifier output, as it crosses the model boundary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawEmotion {
    pub dominant_emotion: String,
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
}

impl RawEmotion {
    pub fn new(dominant_emotion: impl Into<String>) -> Self {
        Self {
            dominant_emotion: dominant_emotion.into(),
            scores: BTreeMap::new(),
        }
    }
}

/// Typed classification with optional per-label confidences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionClassification {
    pub dominant_emotion: Emotion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidences: Option<BTreeMap<Emotion, f64>>,
}

impl EmotionClassification {
    pub fn new(dominant_emotion: Emotion) -> Self {
        Self {
            dominant_emotion,
            confidences: None,
        }
    }

    /// Confidence of the dominant label, if the classifier reported one
    pub fn dominant_confidence(&self) -> Option<f64> {
        self.confidences
            .as_ref()
            .and_then(|c| c.get(&self.dominant_emotion).copied())
    }
}

impl TryFrom<RawEmotion> for EmotionClassification {
    type Error = Error;

    /// Every label, dominant or scored, must belong to the closed set.
    fn try_from(raw: RawEmotion) -> Result<Self, Self::Error> {
        let dominant_emotion = raw.dominant_emotion.parse::<Emotion>()?;
        let confidences = if raw.scores.is_empty() {
            None
        } else {
            let mut map = BTreeMap::new();
            for (label, confidence) in raw.scores {
                map.insert(label.parse::<Emotion>()?, confidence);
            }
            Some(map)
        };
        Ok(Self {
            dominant_emotion,
            confidences,
        })
    }
}
