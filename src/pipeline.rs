//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Exhaustion. It wires the
//! per-frame tracker into fusion, trajectory prediction, and pattern attribution.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::frame::FrameTracker;
use crate::fusion::calculate_exhaustion_index;
use crate::pattern::detect_exhaustion_pattern;
use crate::trajectory::predict_fatigue_trajectory;
use crate::types::{
    BehavioralMetrics, ExhaustionResult, FaceObservation, FactorContribution, FrameMetrics,
    PatternAnalysis, PhysiologicalMetrics, SessionSummary, TrajectoryPrediction,
};

/// Default number of fused scores kept for trajectory prediction
pub const DEFAULT_HISTORY_WINDOW: usize = 120;

/// Input document for a single fusion call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionInput {
    pub behavioral: BehavioralMetrics,
    pub physiological: PhysiologicalMetrics,
}

/// Fusion, pattern attribution and trajectory for one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExhaustionReport {
    pub exhaustion: ExhaustionResult,
    pub pattern: PatternAnalysis,
    pub trajectory: TrajectoryPrediction,
}

/// Fuse one set of metrics.
///
/// # Arguments
/// * `input_json` - A `FusionInput` document; absent factors are skipped
///
/// # Returns
/// `ExhaustionResult` as JSON
///
/// # Example
/// ```ignore
/// let result = exhaustion_from_json(
///     r#"{"behavioral": {"tab_switch": 0.4}, "physiological": {"eye_fatigue": 0.2}}"#
///         .to_string(),
/// )?;
/// ```
pub fn exhaustion_from_json(input_json: String) -> Result<String, ComputeError> {
    let input: FusionInput = serde_json::from_str(&input_json)?;
    let result = calculate_exhaustion_index(&input.behavioral, &input.physiological);
    Ok(serde_json::to_string(&result)?)
}

/// Predict the score trajectory from a JSON array of fused scores (oldest first).
///
/// # Returns
/// `TrajectoryPrediction` as JSON
pub fn trajectory_from_json(history_json: String) -> Result<String, ComputeError> {
    let history: Vec<f64> = serde_json::from_str(&history_json)?;
    let prediction = predict_fatigue_trajectory(&history);
    Ok(serde_json::to_string(&prediction)?)
}

/// Attribute the exhaustion pattern from a JSON array of factor contributions.
///
/// # Returns
/// `PatternAnalysis` as JSON
pub fn pattern_from_json(factors_json: String) -> Result<String, ComputeError> {
    let factors: Vec<FactorContribution> = serde_json::from_str(&factors_json)?;
    let analysis = detect_exhaustion_pattern(&factors);
    Ok(serde_json::to_string(&analysis)?)
}

/// Bounded history of fused scores, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreHistory {
    window_size: usize,
    scores: VecDeque<f64>,
}

impl Default for ScoreHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_WINDOW)
    }
}

impl ScoreHistory {
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            scores: VecDeque::with_capacity(window_size),
        }
    }

    pub fn push(&mut self, score: f64) {
        self.scores.push_back(score);
        while self.scores.len() > self.window_size {
            self.scores.pop_front();
        }
    }

    pub fn scores(&self) -> Vec<f64> {
        self.scores.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn clear(&mut self) {
        self.scores.clear();
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Stateful processor for one user session.
///
/// Owns the frame tracker and the fused score history. Use this when frames,
/// fusion and prediction should share state across calls.
pub struct ExhaustionProcessor {
    tracker: FrameTracker,
    history: ScoreHistory,
    last_frame: Option<FrameMetrics>,
}

impl Default for ExhaustionProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ExhaustionProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            tracker: FrameTracker::new(config),
            history: ScoreHistory::default(),
            last_frame: None,
        }
    }

    /// Create a processor keeping at most `samples` fused scores
    pub fn with_history_window(samples: usize) -> Self {
        Self {
            history: ScoreHistory::new(samples),
            ..Self::new()
        }
    }

    /// Run one frame through the per-frame pipeline.
    ///
    /// Frames without a face do not replace the latest physiological reading.
    pub fn process_frame(
        &mut self,
        face: Option<&FaceObservation>,
        now_ms: i64,
    ) -> Result<FrameMetrics, ComputeError> {
        let metrics = self.tracker.process(face, now_ms)?;
        if face.is_some() {
            self.last_frame = Some(metrics.clone());
        }
        Ok(metrics)
    }

    /// Physiological fusion inputs derived from the latest frame with a face
    pub fn physiological(&self) -> PhysiologicalMetrics {
        self.last_frame
            .as_ref()
            .map(PhysiologicalMetrics::from_frame)
            .unwrap_or_default()
    }

    /// Fuse behavioral metrics with the latest physiological reading and record
    /// the result in the history.
    pub fn fuse(&mut self, behavioral: &BehavioralMetrics) -> ExhaustionResult {
        let result = calculate_exhaustion_index(behavioral, &self.physiological());
        self.record_score(result.total_score);
        result
    }

    /// Append an externally computed score to the history
    pub fn record_score(&mut self, score: f64) {
        if !score.is_finite() {
            debug!(score, "non-finite score ignored");
            return;
        }
        self.history.push(score.clamp(0.0, 100.0));
    }

    pub fn predict(&self) -> TrajectoryPrediction {
        predict_fatigue_trajectory(&self.history.scores())
    }

    /// Fuse, attribute and project in one call
    pub fn analyze(&mut self, behavioral: &BehavioralMetrics) -> ExhaustionReport {
        let exhaustion = self.fuse(behavioral);
        let pattern = detect_exhaustion_pattern(&exhaustion.factors);
        let trajectory = self.predict();
        ExhaustionReport {
            exhaustion,
            pattern,
            trajectory,
        }
    }

    pub fn history(&self) -> Vec<f64> {
        self.history.scores()
    }

    pub fn summary(&self) -> &SessionSummary {
        self.tracker.summary()
    }

    pub fn needs_intervention(&self) -> bool {
        self.tracker.needs_intervention()
    }

    /// Save score history to JSON
    pub fn save_history(&self) -> Result<String, ComputeError> {
        Ok(self.history.to_json()?)
    }

    /// Load score history from JSON
    pub fn load_history(&mut self, json: &str) -> Result<(), ComputeError> {
        let mut history =
            ScoreHistory::from_json(json).map_err(|e| ComputeError::ParseError(e.to_string()))?;
        if history.window_size == 0 {
            return Err(ComputeError::ParseError(
                "history window must be positive".to_string(),
            ));
        }
        while history.scores.len() > history.window_size {
            history.scores.pop_front();
        }
        self.history = history;
        Ok(())
    }

    /// Start a fresh session: tracker state, latest frame and history are cleared
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.history.clear();
        self.last_frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_support::{face, FaceShape};
    use crate::types::{ExhaustionLevel, ExhaustionPattern, Trend};
    use pretty_assertions::assert_eq;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_exhaustion_from_json() {
        let input = r#"{
            "behavioral": {"tab_switch": 0.5, "typing_fatigue": 0.5},
            "physiological": {"eye_fatigue": 0.4}
        }"#;
        let output = exhaustion_from_json(input.to_string()).unwrap();
        let result: ExhaustionResult = serde_json::from_str(&output).unwrap();

        // Behavioral penalty 0.10, physiological 0.10 => 90 and 90
        assert!((result.behavioral_score - 90.0).abs() < 1e-9);
        assert!((result.physiological_score - 90.0).abs() < 1e-9);
        assert!((result.total_score - 90.0).abs() < 1e-9);
        assert_eq!(result.level, ExhaustionLevel::Optimal);
        assert_eq!(result.factors.len(), 3);
    }

    #[test]
    fn test_exhaustion_from_json_rejects_garbage() {
        let result = exhaustion_from_json("not json".to_string());
        assert!(matches!(result, Err(ComputeError::JsonError(_))));
    }

    #[test]
    fn test_trajectory_from_json() {
        let output = trajectory_from_json("[90, 88, 86, 84, 82, 80]".to_string()).unwrap();
        let prediction: TrajectoryPrediction = serde_json::from_str(&output).unwrap();
        assert_eq!(prediction.trend, Trend::Critical);
        assert!(prediction.time_to_exhaustion_minutes.is_some());
    }

    #[test]
    fn test_pattern_from_json_roundtrips_fusion_factors() {
        let fused = exhaustion_from_json(
            r#"{"physiological": {"eye_fatigue": 0.8, "blink_rate": 0.6}}"#.to_string(),
        )
        .unwrap();
        let result: ExhaustionResult = serde_json::from_str(&fused).unwrap();
        let factors = serde_json::to_string(&result.factors).unwrap();

        let output = pattern_from_json(factors).unwrap();
        let analysis: PatternAnalysis = serde_json::from_str(&output).unwrap();
        assert_eq!(analysis.pattern, ExhaustionPattern::Visual);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut processor = ExhaustionProcessor::with_history_window(5);
        for i in 0..8 {
            processor.record_score(100.0 - i as f64);
        }
        assert_eq!(processor.history(), vec![97.0, 96.0, 95.0, 94.0, 93.0]);
    }

    #[test]
    fn test_record_score_clamps_and_skips_nan() {
        let mut processor = ExhaustionProcessor::new();
        processor.record_score(140.0);
        processor.record_score(f64::NAN);
        processor.record_score(-3.0);
        assert_eq!(processor.history(), vec![100.0, 0.0]);
    }

    #[test]
    fn test_fuse_uses_latest_frame() {
        let mut processor = ExhaustionProcessor::new();
        processor
            .process_frame(Some(&face(FaceShape::closed_eyes())), T0)
            .unwrap();
        // A faceless frame keeps the previous reading
        processor.process_frame(None, T0 + 33).unwrap();

        let physiological = processor.physiological();
        assert_eq!(physiological.ear_score, Some(1.0));

        let result = processor.fuse(&BehavioralMetrics::default());
        assert!(result.physiological_score < 100.0);
        assert_eq!(processor.history().len(), 1);
    }

    #[test]
    fn test_fuse_without_frames_is_optimal() {
        let mut processor = ExhaustionProcessor::new();
        let result = processor.fuse(&BehavioralMetrics::default());
        assert_eq!(result.total_score, 100.0);
        assert_eq!(result.level, ExhaustionLevel::Optimal);
    }

    #[test]
    fn test_analyze_combines_all_stages() {
        let mut processor = ExhaustionProcessor::new();
        let behavioral = BehavioralMetrics {
            tab_switch: Some(0.9),
            ..Default::default()
        };

        for _ in 0..4 {
            processor.record_score(95.0);
        }
        let report = processor.analyze(&behavioral);

        // 0.4 * 91 + 0.6 * 100
        assert!((report.exhaustion.total_score - 96.4).abs() < 1e-9);
        assert_eq!(report.pattern.pattern, ExhaustionPattern::Cognitive);
        // Fifth sample enables prediction
        assert_eq!(processor.history().len(), 5);
        assert_ne!(report.trajectory.recommendation, "Not enough data for prediction yet");
    }

    #[test]
    fn test_history_save_load() {
        let mut processor = ExhaustionProcessor::with_history_window(10);
        processor.record_score(80.0);
        processor.record_score(75.0);
        let json = processor.save_history().unwrap();

        let mut restored = ExhaustionProcessor::new();
        restored.load_history(&json).unwrap();
        assert_eq!(restored.history(), vec![80.0, 75.0]);

        assert!(restored.load_history("{").is_err());
    }

    #[test]
    fn test_load_history_trims_to_window() {
        let json = r#"{"window_size": 2, "scores": [90, 80, 70]}"#;
        let mut processor = ExhaustionProcessor::new();
        processor.load_history(json).unwrap();
        assert_eq!(processor.history(), vec![80.0, 70.0]);

        let zero = r#"{"window_size": 0, "scores": []}"#;
        assert!(matches!(
            processor.load_history(zero),
            Err(ComputeError::ParseError(_))
        ));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut processor = ExhaustionProcessor::new();
        processor
            .process_frame(Some(&face(FaceShape::default())), T0)
            .unwrap();
        processor.record_score(60.0);

        processor.reset();
        assert!(processor.history().is_empty());
        assert_eq!(processor.physiological(), PhysiologicalMetrics::default());
        assert_eq!(processor.summary().frames_processed, 0);
    }
}
