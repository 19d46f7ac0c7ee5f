//! Synheart Exhaustion - On-device fatigue and exhaustion engine
//!
//! Turns a stream of facial-landmark observations into per-frame physiological
//! metrics, fuses them with interaction-derived behavioral metrics into a single
//! exhaustion index, projects that index forward, and attributes the dominant
//! exhaustion type.
//!
//! ## Modules
//!
//! - **Per-frame pipeline**: geometry → stress → blink rate → posture → `FrameMetrics`
//! - **Fusion**: behavioral + physiological penalties → `ExhaustionResult`
//! - **Prediction**: score history → `TrajectoryPrediction`, factors → `PatternAnalysis`
//! - **Sessions**: async request/response tracking around an external landmark detector

pub mod blink;
pub mod config;
pub mod error;
pub mod frame;
pub mod fusion;
pub mod geometry;
pub mod pattern;
pub mod pipeline;
pub mod posture;
pub mod session;
pub mod stress;
pub mod trajectory;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::EngineConfig;
pub use error::ComputeError;
pub use frame::FrameTracker;
pub use fusion::calculate_exhaustion_index;
pub use pattern::detect_exhaustion_pattern;
pub use pipeline::{
    exhaustion_from_json, pattern_from_json, trajectory_from_json, ExhaustionProcessor,
    ExhaustionReport, FusionInput,
};
pub use session::{LandmarkDetector, SharedSession, TrackingSession};
pub use trajectory::predict_fatigue_trajectory;
pub use types::*;

/// Engine version
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI and FFI
pub const PRODUCER_NAME: &str = "synheart-exhaustion";
