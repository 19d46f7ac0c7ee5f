//! Head posture analysis
//!
//! Turns a head pose into an additive posture penalty. The penalties are not
//! mutually exclusive, so the score tops out at 60 with the default weights and
//! needs no clamping for a 0-100 display.

use serde::{Deserialize, Serialize};

use crate::config::PostureConfig;
use crate::geometry::HeadPose;

/// Posture flags and penalty for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PostureReading {
    pub is_slumping: bool,
    pub is_forward_head: bool,
    pub tilt_angle_deg: f64,
    pub posture_score: f64,
}

impl PostureReading {
    pub fn neutral() -> Self {
        Self {
            is_slumping: false,
            is_forward_head: false,
            tilt_angle_deg: 0.0,
            posture_score: 0.0,
        }
    }
}

/// Score a head pose
pub fn analyze_posture(pose: &HeadPose, config: &PostureConfig) -> PostureReading {
    let mut posture_score = 0.0;
    if pose.is_slumping {
        posture_score += config.slump_penalty;
    }
    if pose.is_forward_head {
        posture_score += config.forward_head_penalty;
    }
    if pose.tilt_angle_deg.abs() > config.tilt_limit_deg {
        posture_score += config.tilt_penalty;
    }

    PostureReading {
        is_slumping: pose.is_slumping,
        is_forward_head: pose.is_forward_head,
        tilt_angle_deg: pose.tilt_angle_deg,
        posture_score,
    }
}
