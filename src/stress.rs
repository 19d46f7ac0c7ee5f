//! Blink and squint stress tracking
//!
//! Consecutive low-EAR frames form one closure. The first frame of a closure is a
//! blink candidate; a closure that lasts longer than `squint_min_frames` is a
//! squint and adds stress when the eyes reopen. Stress decays slowly while the
//! eyes stay open.

use serde::{Deserialize, Serialize};

use crate::config::EyeConfig;

/// What happened to the eyes on one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeState {
    /// Eyes are currently below the EAR threshold
    pub eye_fatigue: bool,
    /// This frame is the first of a new closure
    pub closure_started: bool,
    /// Stress added by a squint that ended on this frame
    pub squint_stress: f64,
}

/// Per-session closure counter and stress accumulator
#[derive(Debug, Clone)]
pub struct StressTracker {
    consecutive_low_ear_frames: u32,
    stress_level: f64,
    config: EyeConfig,
}

impl Default for StressTracker {
    fn default() -> Self {
        Self::new(EyeConfig::default())
    }
}

impl StressTracker {
    pub fn new(config: EyeConfig) -> Self {
        Self {
            consecutive_low_ear_frames: 0,
            stress_level: 0.0,
            config,
        }
    }

    /// Advance by one frame with the given mean EAR
    pub fn observe(&mut self, avg_ear: f64) -> EyeState {
        if avg_ear < self.config.ear_threshold {
            self.consecutive_low_ear_frames = self.consecutive_low_ear_frames.saturating_add(1);
            return EyeState {
                eye_fatigue: true,
                closure_started: self.consecutive_low_ear_frames == 1,
                squint_stress: 0.0,
            };
        }

        let mut squint_stress = 0.0;
        if self.consecutive_low_ear_frames > self.config.squint_min_frames {
            squint_stress = (self.consecutive_low_ear_frames as f64 * self.config.stress_per_frame)
                .min(self.config.max_stress_per_squint);
            self.stress_level += squint_stress;
        }
        self.consecutive_low_ear_frames = 0;

        if squint_stress == 0.0 && self.stress_level > 0.0 {
            self.stress_level = (self.stress_level - self.config.stress_decay_per_frame).max(0.0);
        }

        EyeState {
            eye_fatigue: false,
            closure_started: false,
            squint_stress,
        }
    }

    /// Current stress, unfloored
    pub fn stress_level(&self) -> f64 {
        self.stress_level
    }

    /// Current stress floored for display
    pub fn display_stress(&self) -> u32 {
        self.stress_level.floor() as u32
    }

    pub fn consecutive_low_ear_frames(&self) -> u32 {
        self.consecutive_low_ear_frames
    }

    pub fn reset(&mut self) {
        self.consecutive_low_ear_frames = 0;
        self.stress_level = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: f64 = 0.30;
    const CLOSED: f64 = 0.10;

    #[test]
    fn test_first_closed_frame_starts_closure() {
        let mut tracker = StressTracker::default();
        let first = tracker.observe(CLOSED);
        assert!(first.eye_fatigue);
        assert!(first.closure_started);

        let second = tracker.observe(CLOSED);
        assert!(second.eye_fatigue);
        assert!(!second.closure_started);
        assert_eq!(tracker.consecutive_low_ear_frames(), 2);
    }

    #[test]
    fn test_short_closure_adds_no_stress() {
        let mut tracker = StressTracker::default();
        tracker.observe(CLOSED);
        tracker.observe(CLOSED);
        let reopened = tracker.observe(OPEN);

        assert_eq!(reopened.squint_stress, 0.0);
        assert_eq!(tracker.stress_level(), 0.0);
        assert_eq!(tracker.consecutive_low_ear_frames(), 0);
    }

    #[test]
    fn test_squint_adds_stress_without_same_frame_decay() {
        let mut tracker = StressTracker::default();
        for _ in 0..4 {
            tracker.observe(CLOSED);
        }
        let reopened = tracker.observe(OPEN);

        assert_eq!(reopened.squint_stress, 2.0);
        assert_eq!(tracker.stress_level(), 2.0);

        // Decay resumes on the next open frame
        tracker.observe(OPEN);
        assert!((tracker.stress_level() - 1.9).abs() < 1e-9);
    }

    #[test]
    fn test_squint_stress_is_capped() {
        let mut tracker = StressTracker::default();
        for _ in 0..40 {
            tracker.observe(CLOSED);
        }
        let reopened = tracker.observe(OPEN);
        assert_eq!(reopened.squint_stress, 5.0);
    }

    #[test]
    fn test_stress_never_negative() {
        let mut tracker = StressTracker::default();
        for _ in 0..3 {
            tracker.observe(CLOSED);
        }
        tracker.observe(OPEN);
        for _ in 0..100 {
            tracker.observe(OPEN);
        }
        assert_eq!(tracker.stress_level(), 0.0);
    }

    #[test]
    fn test_display_stress_floors() {
        let mut tracker = StressTracker::default();
        for _ in 0..5 {
            tracker.observe(CLOSED);
        }
        tracker.observe(OPEN); // +2.5
        assert_eq!(tracker.display_stress(), 2);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut tracker = StressTracker::default();
        assert!(!tracker.observe(0.22).eye_fatigue);
        assert!(tracker.observe(0.2199).eye_fatigue);
    }

    #[test]
    fn test_reset() {
        let mut tracker = StressTracker::default();
        for _ in 0..5 {
            tracker.observe(CLOSED);
        }
        tracker.observe(OPEN);
        tracker.observe(CLOSED);
        tracker.reset();
        assert_eq!(tracker.stress_level(), 0.0);
        assert_eq!(tracker.consecutive_low_ear_frames(), 0);
    }
}
