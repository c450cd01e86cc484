//! Error types for PsyScan

use thiserror::Error;
use crate::types::LoopState;

/// Failure of an external model call for one cycle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("landmark detection failed: {0}")]
    Landmarks(String),

    #[error("emotion classification failed: {0}")]
    Emotion(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request fields: {}", fields.join(", "))]
    Validation { fields: Vec<String> },

    #[error("Capture source unavailable: {0}")]
    CaptureSourceUnavailable(String),

    #[error("Analysis loop is not running (state {0})")]
    LoopNotRunning(LoopState),

    #[error("Inference failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Unrecognized emotion label: {0:?}")]
    UnrecognizedEmotionLabel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Short machine-readable kind for API bodies and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::CaptureSourceUnavailable(_) => "capture_source_unavailable",
            Error::LoopNotRunning(_) => "loop_not_running",
            Error::Inference(_) => "inference_failure",
            Error::UnrecognizedEmotionLabel(_) => "unrecognized_emotion_label",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// Client errors are the caller's fault and are never retried
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::Validation { .. } | Error::UnrecognizedEmotionLabel(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
