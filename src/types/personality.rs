//! Big-Five style trait levels and mental-state labels

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Traits reported in a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Trait {
    Openness,
    Neuroticism,
    Extroversion,
    Conscientiousness,
}

impl Trait {
    pub const ALL: [Trait; 4] = [
        Trait::Openness,
        Trait::Neuroticism,
        Trait::Extroversion,
        Trait::Conscientiousness,
    ];
}

/// Three-level ordinal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TraitLevel {
    Low,
    Moderate,
    High,
}

impl std::fmt::Display for TraitLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TraitLevel::Low => "Low",
            TraitLevel::Moderate => "Moderate",
            TraitLevel::High => "High",
        };
        write!(f, "{}", name)
    }
}

/// Coarse mental-state reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MentalState {
    #[serde(rename = "acute-stress/defensive")]
    AcuteStress,
    #[serde(rename = "low-affect/depressive")]
    LowAffect,
    #[serde(rename = "positive/confident")]
    Positive,
    #[serde(rename = "stable/focused")]
    Stable,
}

impl MentalState {
    pub fn label(&self) -> &'static str {
        match self {
            MentalState::AcuteStress => "acute-stress/defensive",
            MentalState::LowAffect => "low-affect/depressive",
            MentalState::Positive => "positive/confident",
            MentalState::Stable => "stable/focused",
        }
    }

    /// Summary verdict sentence for the profile
    pub fn verdict(&self) -> &'static str {
        match self {
            MentalState::AcuteStress => "Defensive reaction; answers may be guarded",
            MentalState::LowAffect => "Withdrawn affect; low engagement with the question",
            MentalState::Positive => "Open and confident engagement",
            MentalState::Stable => "Composed and attentive",
        }
    }
}

impl std::fmt::Display for MentalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Trait levels plus mental state. All four traits are always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityProfile {
    pub traits: BTreeMap<Trait, TraitLevel>,
    pub mental_state: MentalState,
    pub verdict: String,
}

impl PersonalityProfile {
    /// Profile with every trait at Moderate
    pub fn moderate(mental_state: MentalState) -> Self {
        Self {
            traits: Trait::ALL.into_iter().map(|t| (t, TraitLevel::Moderate)).collect(),
            mental_state,
            verdict: mental_state.verdict().to_string(),
        }
    }

    pub fn set(&mut self, tr: Trait, level: TraitLevel) {
        self.traits.insert(tr, level);
    }

    pub fn level(&self, tr: Trait) -> TraitLevel {
        self.traits.get(&tr).copied().unwrap_or(TraitLevel::Moderate)
    }

    /// One-line "O:High N:Moderate E:Low C:Moderate" summary
    pub fn short_string(&self) -> String {
        format!(
            "O:{} N:{} E:{} C:{}",
            self.level(Trait::Openness),
            self.level(Trait::Neuroticism),
            self.level(Trait::Extroversion),
            self.level(Trait::Conscientiousness),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderate_profile_has_all_traits() {
        let profile = PersonalityProfile::moderate(MentalState::Stable);
        assert_eq!(profile.traits.len(), 4);
        assert!(profile.traits.values().all(|l| *l == TraitLevel::Moderate));
    }

    #[test]
    fn test_mental_state_serializes_to_label() {
        let json = serde_json::to_string(&MentalState::AcuteStress).unwrap();
        assert_eq!(json, "\"acute-stress/defensive\"");
    }
}
