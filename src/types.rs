//! Core types for the Synheart Exhaustion pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: landmark observations, per-frame metrics, fusion inputs and outputs,
//! trajectory predictions, and pattern classifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single facial landmark in image-pixel space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    /// Depth, when the landmark model provides it (unused by the heuristics)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Keypoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Euclidean distance in the image plane
    pub fn distance(&self, other: &Keypoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// One detected face: the full keypoint mesh indexed by anatomical numbering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    pub keypoints: Vec<Keypoint>,
}

/// Immutable snapshot produced once per processed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameMetrics {
    /// True while the eyes are currently below the EAR threshold
    pub eye_fatigue: bool,
    /// Accumulated stress, floored for display
    pub stress_level: u32,
    /// Mean eye aspect ratio of both eyes
    pub avg_ear: f64,
    /// Eye closure score (0-100)
    pub ear_score: u32,
    /// Blinks registered in the last 60 seconds
    pub blinks_per_min: u32,
    /// Blink rate penalty (0-100)
    pub blink_rate_score: u32,
    /// Blink rate is outside the tolerable range
    pub blink_fatigued: bool,
    pub is_slumping: bool,
    pub is_forward_head: bool,
    /// Head roll in degrees, rounded
    pub head_tilt_deg: i32,
    /// Posture penalty (0-60)
    pub posture_score: u32,
    /// Combined per-frame physiological fatigue score (0-100, higher = more fatigued)
    pub physiological_score: u32,
}

impl FrameMetrics {
    /// Neutral metrics for a frame without a detected face
    pub fn no_signal() -> Self {
        Self {
            eye_fatigue: false,
            stress_level: 0,
            avg_ear: 0.0,
            ear_score: 0,
            blinks_per_min: 0,
            blink_rate_score: 0,
            blink_fatigued: false,
            is_slumping: false,
            is_forward_head: false,
            head_tilt_deg: 0,
            posture_score: 0,
            physiological_score: 0,
        }
    }
}

/// Which side of the fusion a factor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorCategory {
    Behavioral,
    Physiological,
}

/// Every factor the fusion engine knows how to weigh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    TabSwitch,
    TypingFatigue,
    ClickAccuracy,
    MouseErratic,
    ScrollAnxiety,
    TimeOfDay,
    IdleTime,
    EyeFatigue,
    BlinkRate,
    EarScore,
    StressLevel,
}

impl FactorKind {
    /// All factors in fusion order (behavioral first, then physiological)
    pub const ALL: [FactorKind; 11] = [
        FactorKind::TabSwitch,
        FactorKind::TypingFatigue,
        FactorKind::ClickAccuracy,
        FactorKind::MouseErratic,
        FactorKind::ScrollAnxiety,
        FactorKind::TimeOfDay,
        FactorKind::IdleTime,
        FactorKind::EyeFatigue,
        FactorKind::BlinkRate,
        FactorKind::EarScore,
        FactorKind::StressLevel,
    ];

    /// Fraction of the final score this factor can move.
    ///
    /// Behavioral weights sum to 0.40 and physiological weights to 0.60; keep
    /// both sums intact when adding a factor.
    pub fn weight(&self) -> f64 {
        match self {
            FactorKind::TabSwitch => 0.10,
            FactorKind::TypingFatigue => 0.10,
            FactorKind::ClickAccuracy => 0.07,
            FactorKind::MouseErratic => 0.05,
            FactorKind::ScrollAnxiety => 0.03,
            FactorKind::TimeOfDay => 0.03,
            FactorKind::IdleTime => 0.02,
            FactorKind::EyeFatigue => 0.25,
            FactorKind::BlinkRate => 0.15,
            FactorKind::EarScore => 0.10,
            FactorKind::StressLevel => 0.10,
        }
    }

    pub fn category(&self) -> FactorCategory {
        match self {
            FactorKind::TabSwitch
            | FactorKind::TypingFatigue
            | FactorKind::ClickAccuracy
            | FactorKind::MouseErratic
            | FactorKind::ScrollAnxiety
            | FactorKind::TimeOfDay
            | FactorKind::IdleTime => FactorCategory::Behavioral,
            FactorKind::EyeFatigue
            | FactorKind::BlinkRate
            | FactorKind::EarScore
            | FactorKind::StressLevel => FactorCategory::Physiological,
        }
    }

    /// Human-readable name used in recommendations
    pub fn display_name(&self) -> &'static str {
        match self {
            FactorKind::TabSwitch => "Tab Switching",
            FactorKind::TypingFatigue => "Typing Fatigue",
            FactorKind::ClickAccuracy => "Click Accuracy",
            FactorKind::MouseErratic => "Mouse Movement",
            FactorKind::ScrollAnxiety => "Scroll Behavior",
            FactorKind::TimeOfDay => "Time of Day",
            FactorKind::IdleTime => "Idle Time",
            FactorKind::EyeFatigue => "Eye Fatigue",
            FactorKind::BlinkRate => "Blink Rate",
            FactorKind::EarScore => "Eye Closure",
            FactorKind::StressLevel => "Stress Level",
        }
    }
}

/// Interaction-derived penalty scores. Absent fields are not measured and are
/// excluded from fusion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehavioralMetrics {
    pub tab_switch: Option<f64>,
    pub typing_fatigue: Option<f64>,
    pub click_accuracy: Option<f64>,
    pub mouse_erratic: Option<f64>,
    pub scroll_anxiety: Option<f64>,
    pub time_of_day: Option<f64>,
    pub idle_time: Option<f64>,
}

impl BehavioralMetrics {
    /// Present values in fusion order
    pub fn entries(&self) -> Vec<(FactorKind, f64)> {
        [
            (FactorKind::TabSwitch, self.tab_switch),
            (FactorKind::TypingFatigue, self.typing_fatigue),
            (FactorKind::ClickAccuracy, self.click_accuracy),
            (FactorKind::MouseErratic, self.mouse_erratic),
            (FactorKind::ScrollAnxiety, self.scroll_anxiety),
            (FactorKind::TimeOfDay, self.time_of_day),
            (FactorKind::IdleTime, self.idle_time),
        ]
        .into_iter()
        .filter_map(|(kind, value)| value.map(|v| (kind, v)))
        .collect()
    }
}

/// Vision-derived penalty scores. Absent fields are not measured and are
/// excluded from fusion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysiologicalMetrics {
    pub eye_fatigue: Option<f64>,
    pub blink_rate: Option<f64>,
    pub ear_score: Option<f64>,
    pub stress_level: Option<f64>,
}

impl PhysiologicalMetrics {
    /// Present values in fusion order
    pub fn entries(&self) -> Vec<(FactorKind, f64)> {
        [
            (FactorKind::EyeFatigue, self.eye_fatigue),
            (FactorKind::BlinkRate, self.blink_rate),
            (FactorKind::EarScore, self.ear_score),
            (FactorKind::StressLevel, self.stress_level),
        ]
        .into_iter()
        .filter_map(|(kind, value)| value.map(|v| (kind, v)))
        .collect()
    }

    /// Map a frame's sub-scores into fusion inputs, each expressed as a
    /// fraction of its maximum penalty.
    pub fn from_frame(frame: &FrameMetrics) -> Self {
        Self {
            eye_fatigue: Some(frame.physiological_score as f64 / 100.0),
            blink_rate: Some(frame.blink_rate_score as f64 / 100.0),
            ear_score: Some(frame.ear_score as f64 / 100.0),
            stress_level: Some((frame.stress_level as f64 * 2.0).min(100.0) / 100.0),
        }
    }
}

/// A single factor's share of the fused penalty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorContribution {
    pub factor: FactorKind,
    pub name: String,
    /// Value as supplied by the caller
    pub raw_value: f64,
    /// `raw_value * weight`
    pub contribution: f64,
    /// Weight expressed as a percentage
    pub weight_percent: f64,
    pub category: FactorCategory,
}

/// Severity bucket for a fused score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionLevel {
    Optimal,
    Mild,
    Moderate,
    Severe,
    Critical,
}

impl ExhaustionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExhaustionLevel::Optimal => "optimal",
            ExhaustionLevel::Mild => "mild",
            ExhaustionLevel::Moderate => "moderate",
            ExhaustionLevel::Severe => "severe",
            ExhaustionLevel::Critical => "critical",
        }
    }
}

/// Output of one fusion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhaustionResult {
    /// Fused score (0-100, 100 = optimal)
    pub total_score: f64,
    pub level: ExhaustionLevel,
    pub behavioral_score: f64,
    pub physiological_score: f64,
    /// Contributions sorted by descending weighted value
    pub factors: Vec<FactorContribution>,
    pub recommendation: String,
    pub should_intervene: bool,
}

/// Direction of the fitted score trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
    Critical,
}

/// Forward projection of the fused score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPrediction {
    /// Score projected 30 samples ahead, clamped to 0-100
    pub predicted_score: f64,
    /// Samples (minutes at one sample per minute) until the score drops to 40.
    /// `None` when the threshold is never reached on the current trend.
    pub time_to_exhaustion_minutes: Option<f64>,
    pub trend: Trend,
    /// Fitted slope in score points per sample
    pub slope: f64,
    pub recommendation: String,
}

/// Dominant exhaustion type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExhaustionPattern {
    Cognitive,
    Physical,
    Visual,
    Mixed,
    None,
}

/// Pattern attribution for a ranked factor list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub pattern: ExhaustionPattern,
    pub confidence: f64,
    pub causes: Vec<String>,
}

/// Running summary of one tracking session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub frames_processed: u64,
    pub frames_with_face: u64,
    /// Highest floored stress level seen
    pub peak_stress: u32,
    /// Number of transitions into the low-EAR state
    pub eye_fatigue_episodes: u64,
    /// Stress reached the configured critical level
    pub intervention_required: bool,
}

impl SessionSummary {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: Utc::now(),
            frames_processed: 0,
            frames_with_face: 0,
            peak_stress: 0,
            eye_fatigue_episodes: 0,
            intervention_required: false,
        }
    }
}

impl Default for SessionSummary {
    fn default() -> Self {
        Self::new()
    }
}
