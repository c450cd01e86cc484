//! Core types for PsyScan

mod sample;
mod score;
mod emotion;
mod personality;
mod landmarks;
mod state;
mod reason;
mod output;

pub use sample::{BioSignalSample, Mode};
pub use score::{ScoreResult, ScoreTerms, Verdict, PulseStatus, FacialFlag, Factor};
pub use emotion::{Emotion, EmotionClassification, RawEmotion};
pub use personality::{PersonalityProfile, Trait, TraitLevel, MentalState};
pub use landmarks::{Point, FaceLandmarks, Frame};
pub use state::LoopState;
pub use reason::ReasonCode;
pub use output::{CycleOutput, PLACEHOLDER_TEXT};
