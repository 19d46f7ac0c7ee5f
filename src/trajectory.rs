//! Fatigue trajectory prediction
//!
//! Fits an ordinary least-squares line through recent fused scores and projects
//! it forward.
//!
//! The history is assumed to hold roughly one sample per minute. Projection
//! distance and time-to-exhaustion are expressed in samples, so they only read as
//! minutes under that cadence.

use crate::types::{TrajectoryPrediction, Trend};

/// Below this many samples the predictor returns a cold-start result
pub const MIN_SAMPLES: usize = 5;

/// Only the most recent samples are fitted
pub const MAX_SAMPLES: usize = 30;

/// Samples ahead the score is projected
pub const HORIZON_SAMPLES: f64 = 30.0;

/// Score at which the user is considered exhausted
pub const EXHAUSTION_THRESHOLD: f64 = 40.0;

/// Predict where the fused score is heading
///
/// Pure and total: short histories yield the last known score (or 100), an
/// unbounded time to exhaustion, and a stable trend.
pub fn predict_fatigue_trajectory(history: &[f64]) -> TrajectoryPrediction {
    if history.len() < MIN_SAMPLES {
        return TrajectoryPrediction {
            predicted_score: history.last().copied().unwrap_or(100.0),
            time_to_exhaustion_minutes: None,
            trend: Trend::Stable,
            slope: 0.0,
            recommendation: "Not enough data for prediction yet".to_string(),
        };
    }

    let n = history.len().min(MAX_SAMPLES);
    let recent = &history[history.len() - n..];
    let (slope, intercept) = linear_fit(recent);

    let predicted_score = (slope * (n as f64 + HORIZON_SAMPLES) + intercept).clamp(0.0, 100.0);

    let current = recent[n - 1];
    let time_to_exhaustion_minutes = if slope < 0.0 && current > EXHAUSTION_THRESHOLD {
        Some(((EXHAUSTION_THRESHOLD - current) / slope).abs())
    } else {
        None
    };

    let trend = classify_trend(slope);
    let recommendation = recommendation_for(time_to_exhaustion_minutes, trend);

    TrajectoryPrediction {
        predicted_score,
        time_to_exhaustion_minutes,
        trend,
        slope,
        recommendation,
    }
}

/// Classify a fitted slope (score points per sample)
pub fn classify_trend(slope: f64) -> Trend {
    if slope > 0.5 {
        Trend::Improving
    } else if slope > -0.5 {
        Trend::Stable
    } else if slope > -2.0 {
        Trend::Declining
    } else {
        Trend::Critical
    }
}

/// Closed-form least squares over x = 0..n-1. Returns (slope, intercept).
fn linear_fit(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;

    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return (0.0, sum_y / n);
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_x) / n;
    (slope, intercept)
}

fn recommendation_for(time_to_exhaustion: Option<f64>, trend: Trend) -> String {
    match time_to_exhaustion {
        Some(t) if t < 15.0 => {
            return "Take a break NOW - exhaustion imminent within 15 minutes".to_string()
        }
        Some(t) if t < 30.0 => {
            return "Schedule a break within 30 minutes to prevent exhaustion".to_string()
        }
        _ => {}
    }

    match trend {
        Trend::Declining => "Declining trend detected - plan breaks proactively",
        Trend::Critical => "Critical decline - immediate intervention recommended",
        Trend::Improving => "Recovery trend detected - maintain current pace",
        Trend::Stable => "Stable focus levels - you're doing well",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cold_start() {
        let empty = predict_fatigue_trajectory(&[]);
        assert_eq!(empty.predicted_score, 100.0);
        assert_eq!(empty.time_to_exhaustion_minutes, None);
        assert_eq!(empty.trend, Trend::Stable);
        assert!(empty.recommendation.contains("Not enough data"));

        let short = predict_fatigue_trajectory(&[90.0, 60.0, 30.0, 10.0]);
        assert_eq!(short.predicted_score, 10.0);
        assert_eq!(short.time_to_exhaustion_minutes, None);
        assert_eq!(short.trend, Trend::Stable);
    }

    #[test]
    fn test_linear_decline() {
        let history: Vec<f64> = (0..10).map(|i| 100.0 - 5.0 * i as f64).collect();
        let prediction = predict_fatigue_trajectory(&history);

        assert!((prediction.slope + 5.0).abs() < 1e-9);
        assert_eq!(prediction.trend, Trend::Critical);
        // 100 - 5 * (10 + 30) = -100, clamped
        assert_eq!(prediction.predicted_score, 0.0);
        // Current 55, (40 - 55) / -5 = 3
        let tte = prediction.time_to_exhaustion_minutes.unwrap();
        assert!((tte - 3.0).abs() < 1e-9);
        assert!(prediction.recommendation.starts_with("Take a break NOW"));
    }

    #[test]
    fn test_gentle_decline_projects_linearly() {
        let history: Vec<f64> = (0..10).map(|i| 95.0 - i as f64).collect();
        let prediction = predict_fatigue_trajectory(&history);

        assert!((prediction.slope + 1.0).abs() < 1e-9);
        assert_eq!(prediction.trend, Trend::Declining);
        // 95 - (10 + 30) = 55
        assert!((prediction.predicted_score - 55.0).abs() < 1e-9);
        // Current 86, (40 - 86) / -1 = 46 => no deadline message
        let tte = prediction.time_to_exhaustion_minutes.unwrap();
        assert!((tte - 46.0).abs() < 1e-9);
        assert!(prediction.recommendation.starts_with("Declining trend"));
    }

    #[test]
    fn test_schedule_soon_window() {
        // Slope -2, current 90 => 25 samples left
        let history: Vec<f64> = (0..6).map(|i| 100.0 - 2.0 * i as f64).collect();
        let prediction = predict_fatigue_trajectory(&history);
        let tte = prediction.time_to_exhaustion_minutes.unwrap();
        assert!((tte - 25.0).abs() < 1e-9);
        assert!(prediction.recommendation.starts_with("Schedule a break"));
    }

    #[test]
    fn test_flat_history() {
        let prediction = predict_fatigue_trajectory(&[70.0; 12]);
        assert_eq!(prediction.slope, 0.0);
        assert_eq!(prediction.trend, Trend::Stable);
        assert_eq!(prediction.predicted_score, 70.0);
        assert_eq!(prediction.time_to_exhaustion_minutes, None);
        assert!(prediction.recommendation.starts_with("Stable focus"));
    }

    #[test]
    fn test_recovery_is_improving() {
        let history: Vec<f64> = (0..8).map(|i| 30.0 + 3.0 * i as f64).collect();
        let prediction = predict_fatigue_trajectory(&history);
        assert_eq!(prediction.trend, Trend::Improving);
        assert_eq!(prediction.time_to_exhaustion_minutes, None);
        assert_eq!(prediction.predicted_score, 100.0);
    }

    #[test]
    fn test_already_exhausted_has_no_deadline() {
        let history: Vec<f64> = (0..8).map(|i| 50.0 - 3.0 * i as f64).collect();
        let prediction = predict_fatigue_trajectory(&history);
        assert_eq!(prediction.trend, Trend::Critical);
        assert_eq!(prediction.time_to_exhaustion_minutes, None);
        assert!(prediction.recommendation.starts_with("Critical decline"));
    }

    #[test]
    fn test_only_recent_window_is_fitted() {
        // A long flat stretch followed by 30 declining samples
        let mut history = vec![100.0; 50];
        history.extend((0..30).map(|i| 90.0 - i as f64));
        let prediction = predict_fatigue_trajectory(&history);
        assert!((prediction.slope + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_thresholds() {
        assert_eq!(classify_trend(0.51), Trend::Improving);
        assert_eq!(classify_trend(0.5), Trend::Stable);
        assert_eq!(classify_trend(-0.5), Trend::Declining);
        assert_eq!(classify_trend(-2.0), Trend::Critical);
    }
}
