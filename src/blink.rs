//! Blink rate analysis
//!
//! Keeps a rolling window of blink timestamps and scores the resulting rate
//! against the healthy 15-20 blinks/min band. Under-blinking is typical of
//! prolonged screen focus; over-blinking of eye irritation.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::BlinkConfig;

/// Blink rate over the rolling window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlinkRateReading {
    pub blinks_per_min: u32,
    pub is_fatigued: bool,
    /// Penalty (0-100)
    pub blink_rate_score: f64,
}

impl BlinkRateReading {
    pub fn empty() -> Self {
        Self {
            blinks_per_min: 0,
            is_fatigued: false,
            blink_rate_score: 0.0,
        }
    }
}

/// Rolling-window blink counter with debounce
#[derive(Debug, Clone)]
pub struct BlinkRateAnalyzer {
    /// Registered blink timestamps (ms since epoch), oldest first
    history: VecDeque<i64>,
    last_blink_ms: Option<i64>,
    config: BlinkConfig,
}

impl Default for BlinkRateAnalyzer {
    fn default() -> Self {
        Self::new(BlinkConfig::default())
    }
}

impl BlinkRateAnalyzer {
    pub fn new(config: BlinkConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(64),
            last_blink_ms: None,
            config,
        }
    }

    /// Register a blink at `now_ms` unless one was registered within the debounce
    /// interval. Returns whether the blink was stored.
    pub fn register_blink(&mut self, now_ms: i64) -> bool {
        let debounced = match self.last_blink_ms {
            Some(last) => now_ms.saturating_sub(last) > self.config.debounce_ms,
            None => true,
        };

        if debounced {
            self.history.push_back(now_ms);
            self.last_blink_ms = Some(now_ms);
        }
        debounced
    }

    /// Evict blinks that left the window and score the remaining count
    pub fn analyze(&mut self, now_ms: i64) -> BlinkRateReading {
        self.evict(now_ms);

        let blinks_per_min = self.history.len() as u32;
        let (blink_rate_score, is_fatigued) = score_blink_rate(blinks_per_min, &self.config);

        BlinkRateReading {
            blinks_per_min,
            is_fatigued,
            blink_rate_score,
        }
    }

    /// Number of blinks currently held, without evicting
    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_blink_ms = None;
    }

    fn evict(&mut self, now_ms: i64) {
        while let Some(&oldest) = self.history.front() {
            if now_ms.saturating_sub(oldest) >= self.config.window_ms {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Score a blink rate
///
/// - below `low_rate`: fixed penalty, fatigued
/// - above `high_rate`: fixed penalty, fatigued
/// - inside the optimal band: 0
/// - otherwise: `|center - rate| * deviation_score_per_blink`
pub fn score_blink_rate(blinks_per_min: u32, config: &BlinkConfig) -> (f64, bool) {
    if blinks_per_min < config.low_rate {
        (config.low_rate_score, true)
    } else if blinks_per_min > config.high_rate {
        (config.high_rate_score, true)
    } else if (config.optimal_min..=config.optimal_max).contains(&blinks_per_min) {
        (0.0, false)
    } else {
        let deviation = (config.optimal_center() - blinks_per_min as f64).abs();
        (deviation * config.deviation_score_per_blink, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_debounce() {
        let mut analyzer = BlinkRateAnalyzer::default();
        assert!(analyzer.register_blink(T0));
        assert!(!analyzer.register_blink(T0 + 150));
        assert!(!analyzer.register_blink(T0 + 300));
        assert_eq!(analyzer.len(), 1);

        assert!(analyzer.register_blink(T0 + 301));
        assert_eq!(analyzer.len(), 2);
    }

    #[test]
    fn test_extreme_timestamps_do_not_overflow() {
        let mut analyzer = BlinkRateAnalyzer::default();
        assert!(analyzer.register_blink(i64::MIN));
        assert!(analyzer.register_blink(i64::MAX));

        let reading = analyzer.analyze(i64::MAX);
        assert_eq!(reading.blinks_per_min, 1);

        // Time running backwards is treated as within the debounce interval
        assert!(!analyzer.register_blink(i64::MIN));
        assert_eq!(analyzer.analyze(i64::MIN).blinks_per_min, 1);
    }

    #[test]
    fn test_window_eviction() {
        let mut analyzer = BlinkRateAnalyzer::default();
        analyzer.register_blink(T0);
        analyzer.register_blink(T0 + 61_000);

        let reading = analyzer.analyze(T0 + 61_000);
        assert_eq!(reading.blinks_per_min, 1);
    }

    #[test]
    fn test_eviction_boundary_is_inclusive() {
        let mut analyzer = BlinkRateAnalyzer::default();
        analyzer.register_blink(T0);

        assert_eq!(analyzer.analyze(T0 + 59_999).blinks_per_min, 1);
        assert_eq!(analyzer.analyze(T0 + 60_000).blinks_per_min, 0);
        assert!(analyzer.is_empty());
    }

    #[test]
    fn test_scoring_bands() {
        let config = BlinkConfig::default();

        assert_eq!(score_blink_rate(0, &config), (50.0, true));
        assert_eq!(score_blink_rate(9, &config), (50.0, true));
        assert_eq!(score_blink_rate(31, &config), (40.0, true));

        assert_eq!(score_blink_rate(15, &config), (0.0, false));
        assert_eq!(score_blink_rate(20, &config), (0.0, false));

        // Linear penalty from the 17.5 center
        assert_eq!(score_blink_rate(10, &config), (37.5, false));
        assert_eq!(score_blink_rate(14, &config), (17.5, false));
        assert_eq!(score_blink_rate(21, &config), (17.5, false));
        assert_eq!(score_blink_rate(30, &config), (62.5, false));
    }

    #[test]
    fn test_analyze_counts_exact_window() {
        let mut analyzer = BlinkRateAnalyzer::default();
        // 16 blinks, 3 seconds apart
        for i in 0..16 {
            analyzer.register_blink(T0 + i * 3_000);
        }

        let reading = analyzer.analyze(T0 + 50_000);
        assert_eq!(reading.blinks_per_min, 16);
        assert_eq!(reading.blink_rate_score, 0.0);
        assert!(!reading.is_fatigued);
    }

    #[test]
    fn test_reset() {
        let mut analyzer = BlinkRateAnalyzer::default();
        analyzer.register_blink(T0);
        analyzer.reset();
        assert!(analyzer.is_empty());
        // Debounce state is cleared too
        assert!(analyzer.register_blink(T0 + 10));
    }
}
