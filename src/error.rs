//! Error types for Synheart Exhaustion

use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Malformed observation: {0}")]
    MalformedObservation(String),

    #[error("Landmark detector unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("Landmark detection failed: {0}")]
    DetectionFailed(String),

    #[error("A frame is already being processed for this session")]
    FrameInFlight,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
