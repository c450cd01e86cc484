//! Core modules for PsyScan

pub mod features;
pub mod scoring;
pub mod personality;
pub mod realtime;
pub mod render;
pub mod synthetic;
pub mod api;

pub use features::{FeatureExtractor, FacialGeometry};
pub use scoring::{ScoringEngine, SCORE_MAX};
pub use personality::PersonalityInferencer;
pub use realtime::{
    CaptureSource, LandmarkDetector, EmotionClassifier, Renderer,
    LoopSignals, LoopSummary, RealTimeLoopController,
};
pub use render::{OutputFormat, TerminalRenderer, BroadcastRenderer, Tee};
pub use synthetic::{SyntheticCamera, SyntheticFace, SyntheticEmotions};
pub use api::{create_router, run_server, AppState, AnalyzeRequest, AnalyzeResponse};
