//! Tunable constants
//!
//! Every threshold the frame pipeline uses lives here so that a deployment with a
//! different camera or landmark model can recalibrate without touching the code.
//! The defaults reproduce the calibration the heuristics were tuned against: a
//! MediaPipe 468-point face mesh on a typical laptop webcam.

use serde::{Deserialize, Serialize};

use crate::error::ComputeError;

/// Eye closure and stress accumulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeConfig {
    /// EAR below this value counts as closed or squinting
    pub ear_threshold: f64,
    /// A closure lasting more than this many frames is a squint
    pub squint_min_frames: u32,
    /// Stress added per frame of a released squint
    pub stress_per_frame: f64,
    /// Cap on the stress a single squint can add
    pub max_stress_per_squint: f64,
    /// Stress removed per open-eyed frame
    pub stress_decay_per_frame: f64,
}

impl Default for EyeConfig {
    fn default() -> Self {
        Self {
            ear_threshold: 0.22,
            squint_min_frames: 2,
            stress_per_frame: 0.5,
            max_stress_per_squint: 5.0,
            stress_decay_per_frame: 0.1,
        }
    }
}

/// Blink debounce, window, and scoring settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlinkConfig {
    /// Minimum spacing between two registered blinks (ms)
    pub debounce_ms: i64,
    /// Rolling window for the blink rate (ms)
    pub window_ms: i64,
    /// Below this rate the user is under-blinking
    pub low_rate: u32,
    /// Above this rate the user is over-blinking
    pub high_rate: u32,
    pub optimal_min: u32,
    pub optimal_max: u32,
    pub low_rate_score: f64,
    pub high_rate_score: f64,
    /// Penalty per blink/min away from the band center
    pub deviation_score_per_blink: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            window_ms: 60_000,
            low_rate: 10,
            high_rate: 30,
            optimal_min: 15,
            optimal_max: 20,
            low_rate_score: 50.0,
            high_rate_score: 40.0,
            deviation_score_per_blink: 5.0,
        }
    }
}

impl BlinkConfig {
    pub fn optimal_center(&self) -> f64 {
        (self.optimal_min + self.optimal_max) as f64 / 2.0
    }
}

/// Head posture thresholds
///
/// The pixel thresholds are only meaningful at the input resolution and camera
/// distance they were calibrated for. Set `reference_ear_span_px` to the ear-to-ear
/// distance observed at that calibration and the thresholds scale with the
/// observed face size instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    /// Nose below the ear line by more than this is slumping (px)
    pub slump_offset_px: f64,
    /// Chin-to-nose vertical distance under this is forward head (px)
    pub forward_head_px: f64,
    /// Roll beyond this is excessive tilt (degrees)
    pub tilt_limit_deg: f64,
    pub slump_penalty: f64,
    pub forward_head_penalty: f64,
    pub tilt_penalty: f64,
    pub reference_ear_span_px: Option<f64>,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            slump_offset_px: 30.0,
            forward_head_px: 40.0,
            tilt_limit_deg: 15.0,
            slump_penalty: 30.0,
            forward_head_penalty: 20.0,
            tilt_penalty: 10.0,
            reference_ear_span_px: None,
        }
    }
}

/// Keypoint indices into the landmark mesh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkLayout {
    /// Outer corner, two upper lid points, inner corner, two lower lid points
    pub left_eye: [usize; 6],
    pub right_eye: [usize; 6],
    pub nose_tip: usize,
    pub chin: usize,
    pub left_ear: usize,
    pub right_ear: usize,
    /// Largest mesh the detector produces; every index must fall below it
    pub max_keypoints: usize,
}

impl Default for LandmarkLayout {
    fn default() -> Self {
        Self {
            left_eye: [33, 160, 158, 133, 153, 144],
            right_eye: [362, 385, 387, 263, 373, 380],
            nose_tip: 1,
            chin: 152,
            left_ear: 234,
            right_ear: 454,
            max_keypoints: 478,
        }
    }
}

impl LandmarkLayout {
    fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.left_eye
            .iter()
            .chain(self.right_eye.iter())
            .copied()
            .chain([self.nose_tip, self.chin, self.left_ear, self.right_ear])
    }

    /// Number of keypoints an observation must carry for this layout
    pub fn required_keypoints(&self) -> usize {
        self.indices().max().unwrap_or(0).saturating_add(1)
    }
}

/// Full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub eye: EyeConfig,
    pub blink: BlinkConfig,
    pub posture: PostureConfig,
    pub landmarks: LandmarkLayout,
    /// Floored stress level at which a session asks for an intervention
    pub critical_stress: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            eye: EyeConfig::default(),
            blink: BlinkConfig::default(),
            posture: PostureConfig::default(),
            landmarks: LandmarkLayout::default(),
            critical_stress: 15,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a configuration from JSON. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.eye.ear_threshold > 0.0) {
            return Err(ComputeError::InvalidConfig(
                "eye.ear_threshold must be positive".to_string(),
            ));
        }
        if self.eye.stress_per_frame < 0.0
            || self.eye.max_stress_per_squint < 0.0
            || self.eye.stress_decay_per_frame < 0.0
        {
            return Err(ComputeError::InvalidConfig(
                "eye stress settings must not be negative".to_string(),
            ));
        }
        if self.blink.debounce_ms < 0 || self.blink.window_ms <= 0 {
            return Err(ComputeError::InvalidConfig(
                "blink.window_ms must be positive and blink.debounce_ms non-negative".to_string(),
            ));
        }
        if self.blink.optimal_min > self.blink.optimal_max
            || self.blink.low_rate > self.blink.optimal_min
            || self.blink.optimal_max > self.blink.high_rate
        {
            return Err(ComputeError::InvalidConfig(
                "blink rates must satisfy low_rate <= optimal_min <= optimal_max <= high_rate"
                    .to_string(),
            ));
        }
        if self.posture.slump_offset_px <= 0.0
            || self.posture.forward_head_px <= 0.0
            || self.posture.tilt_limit_deg <= 0.0
        {
            return Err(ComputeError::InvalidConfig(
                "posture thresholds must be positive".to_string(),
            ));
        }
        if let Some(span) = self.posture.reference_ear_span_px {
            if !(span > 0.0) {
                return Err(ComputeError::InvalidConfig(
                    "posture.reference_ear_span_px must be positive".to_string(),
                ));
            }
        }
        if let Some(idx) = self
            .landmarks
            .indices()
            .find(|&idx| idx >= self.landmarks.max_keypoints)
        {
            return Err(ComputeError::InvalidConfig(format!(
                "landmark index {} is outside a {}-point mesh",
                idx, self.landmarks.max_keypoints
            )));
        }
        if self.critical_stress == 0 {
            return Err(ComputeError::InvalidConfig(
                "critical_stress must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
