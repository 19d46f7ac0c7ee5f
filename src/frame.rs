//! Per-frame physiological pipeline
//!
//! `FrameTracker` is the per-session entry point: it takes one face observation
//! (or none) and a timestamp, runs geometry → stress → blink rate → posture, and
//! aggregates the result into a single `FrameMetrics` snapshot.
//!
//! Frames must be fed in order. A malformed observation is rejected before any
//! state is touched, so one bad frame never corrupts the blink window or the
//! stress accumulator.

use tracing::{debug, info};

use crate::blink::BlinkRateAnalyzer;
use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::geometry::{average_ear, compute_head_pose};
use crate::posture::analyze_posture;
use crate::stress::StressTracker;
use crate::types::{FaceObservation, FrameMetrics, Keypoint, SessionSummary};

/// EAR score gain: maps the distance below threshold onto 0-100
const EAR_SCORE_GAIN: f64 = 500.0;

/// Aggregation weights for the per-frame physiological score
const EAR_WEIGHT: f64 = 0.4;
const BLINK_WEIGHT: f64 = 0.3;
const POSTURE_WEIGHT: f64 = 0.2;
const STRESS_WEIGHT: f64 = 0.1;

/// Eye closure score
///
/// Formula: `min((threshold - ear) * 500, 100)` below the threshold, else 0
pub fn ear_score(avg_ear: f64, ear_threshold: f64) -> f64 {
    if avg_ear < ear_threshold {
        ((ear_threshold - avg_ear) * EAR_SCORE_GAIN).min(100.0)
    } else {
        0.0
    }
}

/// Round half toward positive infinity, so -2.5 displays as -2
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Combine sub-scores into the per-frame physiological score
///
/// Formula:
/// ```text
/// score = 0.4 * ear_score
///       + 0.3 * blink_rate_score
///       + 0.2 * posture_score
///       + 0.1 * min(stress * 2, 100)
/// ```
pub fn physiological_score(
    ear_score: f64,
    blink_rate_score: f64,
    posture_score: f64,
    stress_level: f64,
) -> u32 {
    let score = ear_score * EAR_WEIGHT
        + blink_rate_score * BLINK_WEIGHT
        + posture_score * POSTURE_WEIGHT
        + (stress_level * 2.0).min(100.0) * STRESS_WEIGHT;
    score.round().clamp(0.0, 100.0) as u32
}

/// Stateful per-session frame processor
#[derive(Debug, Clone)]
pub struct FrameTracker {
    config: EngineConfig,
    stress: StressTracker,
    blinks: BlinkRateAnalyzer,
    summary: SessionSummary,
    eyes_were_closed: bool,
}

impl Default for FrameTracker {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl FrameTracker {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            stress: StressTracker::new(config.eye.clone()),
            blinks: BlinkRateAnalyzer::new(config.blink.clone()),
            summary: SessionSummary::new(),
            eyes_were_closed: false,
            config,
        }
    }

    /// Process one frame
    ///
    /// `face` is `None` when the detector found no face; that yields neutral
    /// metrics rather than an error.
    pub fn process(
        &mut self,
        face: Option<&FaceObservation>,
        now_ms: i64,
    ) -> Result<FrameMetrics, ComputeError> {
        let Some(face) = face else {
            self.summary.frames_processed += 1;
            self.eyes_were_closed = false;
            return Ok(FrameMetrics::no_signal());
        };

        let landmarks = self.extract(face)?;

        self.summary.frames_processed += 1;
        self.summary.frames_with_face += 1;

        // Eyes
        let avg_ear = average_ear(&landmarks.left_eye, &landmarks.right_eye);
        let eye_state = self.stress.observe(avg_ear);
        if eye_state.closure_started && self.blinks.register_blink(now_ms) {
            debug!(now_ms, "blink registered");
        }
        if eye_state.squint_stress > 0.0 {
            debug!(
                added = eye_state.squint_stress,
                stress = self.stress.stress_level(),
                "squint released"
            );
        }

        // Blink rate
        let blink = self.blinks.analyze(now_ms);

        // Posture
        let pose = compute_head_pose(
            &landmarks.nose,
            &landmarks.chin,
            &landmarks.left_ear,
            &landmarks.right_ear,
            &self.config.posture,
        );
        let posture = analyze_posture(&pose, &self.config.posture);

        // Aggregate
        let ear = ear_score(avg_ear, self.config.eye.ear_threshold);
        let stress_level = self.stress.stress_level();
        let physiological = physiological_score(
            ear,
            blink.blink_rate_score,
            posture.posture_score,
            stress_level,
        );

        let metrics = FrameMetrics {
            eye_fatigue: eye_state.eye_fatigue,
            stress_level: self.stress.display_stress(),
            avg_ear,
            ear_score: ear.round() as u32,
            blinks_per_min: blink.blinks_per_min,
            blink_rate_score: blink.blink_rate_score.round() as u32,
            blink_fatigued: blink.is_fatigued,
            is_slumping: posture.is_slumping,
            is_forward_head: posture.is_forward_head,
            head_tilt_deg: round_half_up(posture.tilt_angle_deg) as i32,
            posture_score: posture.posture_score.round() as u32,
            physiological_score: physiological,
        };

        self.update_summary(&metrics);
        Ok(metrics)
    }

    /// Session summary so far
    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }

    /// Stress reached the configured critical level during this session
    pub fn needs_intervention(&self) -> bool {
        self.summary.intervention_required
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Discard all per-session state and start a fresh session
    pub fn reset(&mut self) {
        self.stress.reset();
        self.blinks.reset();
        self.summary = SessionSummary::new();
        self.eyes_were_closed = false;
    }

    fn update_summary(&mut self, metrics: &FrameMetrics) {
        if metrics.eye_fatigue && !self.eyes_were_closed {
            self.summary.eye_fatigue_episodes += 1;
        }
        self.eyes_were_closed = metrics.eye_fatigue;

        self.summary.peak_stress = self.summary.peak_stress.max(metrics.stress_level);

        if !self.summary.intervention_required
            && metrics.stress_level >= self.config.critical_stress
        {
            self.summary.intervention_required = true;
            info!(
                session_id = %self.summary.session_id,
                stress = metrics.stress_level,
                "critical stress reached, intervention required"
            );
        }
    }

    /// Pull the landmarks this pipeline needs out of the mesh
    fn extract(&self, face: &FaceObservation) -> Result<FaceLandmarks, ComputeError> {
        let layout = &self.config.landmarks;
        let required = layout.required_keypoints();
        if face.keypoints.len() < required {
            return Err(ComputeError::MalformedObservation(format!(
                "expected at least {} keypoints, got {}",
                required,
                face.keypoints.len()
            )));
        }

        let point = |idx: usize| -> Result<Keypoint, ComputeError> {
            let kp = face.keypoints[idx];
            if kp.is_finite() {
                Ok(kp)
            } else {
                Err(ComputeError::MalformedObservation(format!(
                    "keypoint {} is not finite",
                    idx
                )))
            }
        };

        let mut left_eye = Vec::with_capacity(6);
        for &idx in &layout.left_eye {
            left_eye.push(point(idx)?);
        }
        let mut right_eye = Vec::with_capacity(6);
        for &idx in &layout.right_eye {
            right_eye.push(point(idx)?);
        }

        Ok(FaceLandmarks {
            left_eye,
            right_eye,
            nose: point(layout.nose_tip)?,
            chin: point(layout.chin)?,
            left_ear: point(layout.left_ear)?,
            right_ear: point(layout.right_ear)?,
        })
    }
}

/// The subset of the mesh the pipeline reads
struct FaceLandmarks {
    left_eye: Vec<Keypoint>,
    right_eye: Vec<Keypoint>,
    nose: Keypoint,
    chin: Keypoint,
    left_ear: Keypoint,
    right_ear: Keypoint,
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::config::LandmarkLayout;
    use crate::types::{FaceObservation, Keypoint};

    /// Face geometry knobs for building synthetic meshes
    #[derive(Debug, Clone, Copy)]
    pub struct FaceShape {
        /// Half of each eyelid opening in px; 1.5 gives EAR 0.3 on a 10px wide eye
        pub eye_opening: f64,
        pub nose_y: f64,
        pub chin_y: f64,
        pub left_ear_y: f64,
        pub right_ear_y: f64,
    }

    impl Default for FaceShape {
        fn default() -> Self {
            Self {
                eye_opening: 1.5,
                nose_y: 250.0,
                chin_y: 330.0,
                left_ear_y: 240.0,
                right_ear_y: 240.0,
            }
        }
    }

    impl FaceShape {
        pub fn closed_eyes() -> Self {
            Self {
                eye_opening: 0.0,
                ..Default::default()
            }
        }
    }

    /// Build a 468-point mesh with the default layout filled in
    pub fn face(shape: FaceShape) -> FaceObservation {
        let layout = LandmarkLayout::default();
        let mut keypoints = vec![Keypoint::new(0.0, 0.0); 468];

        for (eye, x0) in [(layout.left_eye, 280.0), (layout.right_eye, 350.0)] {
            let y0 = 200.0;
            let o = shape.eye_opening;
            let contour = [
                Keypoint::new(x0, y0),
                Keypoint::new(x0 + 3.0, y0 - o),
                Keypoint::new(x0 + 7.0, y0 - o),
                Keypoint::new(x0 + 10.0, y0),
                Keypoint::new(x0 + 7.0, y0 + o),
                Keypoint::new(x0 + 3.0, y0 + o),
            ];
            for (idx, kp) in eye.iter().zip(contour) {
                keypoints[*idx] = kp;
            }
        }

        keypoints[layout.nose_tip] = Keypoint::new(320.0, shape.nose_y);
        keypoints[layout.chin] = Keypoint::new(320.0, shape.chin_y);
        keypoints[layout.left_ear] = Keypoint::new(400.0, shape.left_ear_y);
        keypoints[layout.right_ear] = Keypoint::new(240.0, shape.right_ear_y);

        FaceObservation { keypoints }
    }
}
