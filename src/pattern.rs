//! Exhaustion pattern attribution
//!
//! A small decision tree over the per-category contribution sums. The ratios and
//! cut-offs are tunable heuristics, not physiologically derived values.

use crate::types::{
    ExhaustionPattern, FactorCategory, FactorContribution, FactorKind, PatternAnalysis,
};

/// One side must exceed the other by this factor to dominate
pub const DOMINANCE_RATIO: f64 = 2.0;

/// A motor factor counts toward physical exhaustion above this contribution
pub const MOTOR_FACTOR_MIN_CONTRIBUTION: f64 = 0.05;

/// Both sides must exceed this sum to call the pattern mixed
pub const MIXED_MIN_CONTRIBUTION: f64 = 0.1;

/// Attribute the dominant exhaustion type from ranked factor contributions
pub fn detect_exhaustion_pattern(factors: &[FactorContribution]) -> PatternAnalysis {
    let physiological = category_sum(factors, FactorCategory::Physiological);
    let behavioral = category_sum(factors, FactorCategory::Behavioral);

    if physiological > behavioral * DOMINANCE_RATIO {
        return analysis(
            ExhaustionPattern::Visual,
            0.85,
            &["Eye strain", "Screen brightness", "Prolonged focus"],
        );
    }

    if behavioral > physiological * DOMINANCE_RATIO {
        let motor_strain = factors.iter().any(|f| {
            matches!(f.factor, FactorKind::TypingFatigue | FactorKind::ClickAccuracy)
                && f.contribution > MOTOR_FACTOR_MIN_CONTRIBUTION
        });

        return if motor_strain {
            analysis(
                ExhaustionPattern::Physical,
                0.75,
                &["Repetitive strain", "Hand fatigue", "Motor control decline"],
            )
        } else {
            analysis(
                ExhaustionPattern::Cognitive,
                0.80,
                &["Mental overload", "Context switching", "Decision fatigue"],
            )
        };
    }

    if physiological > MIXED_MIN_CONTRIBUTION && behavioral > MIXED_MIN_CONTRIBUTION {
        return analysis(
            ExhaustionPattern::Mixed,
            0.70,
            &["Multiple exhaustion factors", "Prolonged work", "Insufficient breaks"],
        );
    }

    analysis(ExhaustionPattern::None, 1.0, &[])
}

fn category_sum(factors: &[FactorContribution], category: FactorCategory) -> f64 {
    factors
        .iter()
        .filter(|f| f.category == category)
        .map(|f| f.contribution)
        .sum()
}

fn analysis(pattern: ExhaustionPattern, confidence: f64, causes: &[&str]) -> PatternAnalysis {
    PatternAnalysis {
        pattern,
        confidence,
        causes: causes.iter().map(|c| c.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::calculate_exhaustion_index;
    use crate::types::{BehavioralMetrics, PhysiologicalMetrics};

    fn contribution(factor: FactorKind, contribution: f64) -> FactorContribution {
        FactorContribution {
            factor,
            name: factor.display_name().to_string(),
            raw_value: contribution / factor.weight(),
            contribution,
            weight_percent: factor.weight() * 100.0,
            category: factor.category(),
        }
    }

    #[test]
    fn test_visual_pattern() {
        let factors = vec![
            contribution(FactorKind::EyeFatigue, 0.20),
            contribution(FactorKind::BlinkRate, 0.10),
            contribution(FactorKind::TabSwitch, 0.05),
        ];
        let result = detect_exhaustion_pattern(&factors);
        assert_eq!(result.pattern, ExhaustionPattern::Visual);
        assert_eq!(result.confidence, 0.85);
        assert_eq!(result.causes.len(), 3);
    }

    #[test]
    fn test_physical_pattern() {
        let factors = vec![
            contribution(FactorKind::TypingFatigue, 0.08),
            contribution(FactorKind::TabSwitch, 0.04),
            contribution(FactorKind::EyeFatigue, 0.02),
        ];
        let result = detect_exhaustion_pattern(&factors);
        assert_eq!(result.pattern, ExhaustionPattern::Physical);
        assert_eq!(result.confidence, 0.75);
    }

    #[test]
    fn test_cognitive_pattern_when_motor_factors_are_small() {
        let factors = vec![
            contribution(FactorKind::TabSwitch, 0.09),
            contribution(FactorKind::ClickAccuracy, 0.05),
            contribution(FactorKind::EyeFatigue, 0.02),
        ];
        let result = detect_exhaustion_pattern(&factors);
        assert_eq!(result.pattern, ExhaustionPattern::Cognitive);
        assert_eq!(result.confidence, 0.80);
    }

    #[test]
    fn test_mixed_pattern() {
        let factors = vec![
            contribution(FactorKind::EyeFatigue, 0.15),
            contribution(FactorKind::TabSwitch, 0.10),
            contribution(FactorKind::MouseErratic, 0.02),
        ];
        let result = detect_exhaustion_pattern(&factors);
        assert_eq!(result.pattern, ExhaustionPattern::Mixed);
        assert_eq!(result.confidence, 0.70);
    }

    #[test]
    fn test_balanced_small_sums_are_none() {
        let factors = vec![
            contribution(FactorKind::EyeFatigue, 0.05),
            contribution(FactorKind::TabSwitch, 0.05),
        ];
        let result = detect_exhaustion_pattern(&factors);
        assert_eq!(result.pattern, ExhaustionPattern::None);
        assert_eq!(result.confidence, 1.0);
        assert!(result.causes.is_empty());
    }

    #[test]
    fn test_empty_factors_are_none() {
        let result = detect_exhaustion_pattern(&[]);
        assert_eq!(result.pattern, ExhaustionPattern::None);
    }

    #[test]
    fn test_pattern_from_fusion_output() {
        let behavioral = BehavioralMetrics {
            typing_fatigue: Some(0.9),
            click_accuracy: Some(0.8),
            ..Default::default()
        };
        let result = calculate_exhaustion_index(&behavioral, &PhysiologicalMetrics::default());
        let pattern = detect_exhaustion_pattern(&result.factors);
        assert_eq!(pattern.pattern, ExhaustionPattern::Physical);
    }
}
