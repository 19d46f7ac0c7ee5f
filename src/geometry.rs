//! Geometric feature extraction
//!
//! Stateless helpers that turn raw landmark coordinates into eye aspect ratios and
//! head-pose angles.

use serde::{Deserialize, Serialize};

use crate::config::PostureConfig;
use crate::types::Keypoint;

/// Number of points in an eye contour
pub const EYE_CONTOUR_POINTS: usize = 6;

/// Compute the eye aspect ratio of a six-point contour
///
/// Formula: `(|p1 - p5| + |p2 - p4|) / (2 * |p0 - p3|)`
///
/// Point order: 0 = outer corner, 1/2 = upper lid, 3 = inner corner, 4/5 = lower lid.
/// Returns 0 for contours with fewer than six points or zero width, which reads as
/// a fully closed eye.
pub fn compute_ear(eye: &[Keypoint]) -> f64 {
    if eye.len() < EYE_CONTOUR_POINTS {
        return 0.0;
    }

    let vertical_a = eye[1].distance(&eye[5]);
    let vertical_b = eye[2].distance(&eye[4]);
    let horizontal = eye[0].distance(&eye[3]);

    if horizontal <= 0.0 {
        return 0.0;
    }

    (vertical_a + vertical_b) / (2.0 * horizontal)
}

/// Mean EAR of both eyes
pub fn average_ear(left_eye: &[Keypoint], right_eye: &[Keypoint]) -> f64 {
    (compute_ear(left_eye) + compute_ear(right_eye)) / 2.0
}

/// Head pose derived from four landmarks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    /// Roll of the ear line in degrees
    pub tilt_angle_deg: f64,
    /// Nose sits well below the ear line
    pub is_slumping: bool,
    /// Chin and nose are vertically compressed
    pub is_forward_head: bool,
}

/// Compute head pose from the nose tip, chin, and both ears
///
/// The slump and forward-head thresholds are pixel distances. Unless
/// `reference_ear_span_px` is configured they assume the resolution and camera
/// distance the defaults were calibrated for.
pub fn compute_head_pose(
    nose: &Keypoint,
    chin: &Keypoint,
    left_ear: &Keypoint,
    right_ear: &Keypoint,
    config: &PostureConfig,
) -> HeadPose {
    let tilt = (left_ear.y - right_ear.y).atan2(left_ear.x - right_ear.x);
    let tilt_angle_deg = tilt.to_degrees();

    let scale = threshold_scale(left_ear, right_ear, config);

    let ear_mid_y = (left_ear.y + right_ear.y) / 2.0;
    let is_slumping = nose.y > ear_mid_y + config.slump_offset_px * scale;

    let chin_nose_dist = (chin.y - nose.y).abs();
    let is_forward_head = chin_nose_dist < config.forward_head_px * scale;

    HeadPose {
        tilt_angle_deg,
        is_slumping,
        is_forward_head,
    }
}

/// Compute head pose by looking the four landmarks up in a keypoint mesh
///
/// Returns `None` if any index is out of range.
pub fn head_pose_from_mesh(
    keypoints: &[Keypoint],
    nose_idx: usize,
    chin_idx: usize,
    left_ear_idx: usize,
    right_ear_idx: usize,
    config: &PostureConfig,
) -> Option<HeadPose> {
    Some(compute_head_pose(
        keypoints.get(nose_idx)?,
        keypoints.get(chin_idx)?,
        keypoints.get(left_ear_idx)?,
        keypoints.get(right_ear_idx)?,
        config,
    ))
}

/// Scale factor for pixel thresholds, 1.0 unless a reference ear span is set
fn threshold_scale(left_ear: &Keypoint, right_ear: &Keypoint, config: &PostureConfig) -> f64 {
    match config.reference_ear_span_px {
        Some(reference) if reference > 0.0 => {
            let span = left_ear.distance(right_ear);
            if span > 0.0 {
                span / reference
            } else {
                1.0
            }
        }
        _ => 1.0,
    }
}
