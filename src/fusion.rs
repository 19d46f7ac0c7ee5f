//! Exhaustion index fusion
//!
//! Combines sparse behavioral and physiological penalty sets into one bounded
//! score. Each present factor contributes `value * weight`; the per-category sums
//! are inverted into health scores and blended 40/60.
//!
//! Values are penalty fractions: a value of 1.0 spends the factor's full weight.
//! Larger inputs are accepted but saturate the category score at 0.

use crate::types::{
    BehavioralMetrics, ExhaustionLevel, ExhaustionResult, FactorCategory, FactorContribution,
    PhysiologicalMetrics,
};

/// Share of the final score taken by the behavioral side
pub const BEHAVIORAL_SHARE: f64 = 0.4;

/// Share of the final score taken by the physiological side
pub const PHYSIOLOGICAL_SHARE: f64 = 0.6;

/// Fused scores below this call for an intervention
pub const INTERVENTION_THRESHOLD: f64 = 40.0;

/// Compute the exhaustion index
///
/// Pure and total: empty inputs yield a perfect score. NaN or infinite values
/// are skipped like absent ones.
pub fn calculate_exhaustion_index(
    behavioral: &BehavioralMetrics,
    physiological: &PhysiologicalMetrics,
) -> ExhaustionResult {
    let mut factors = Vec::new();
    let mut behavioral_total = 0.0;
    let mut physiological_total = 0.0;

    for (kind, value) in behavioral.entries().into_iter().chain(physiological.entries()) {
        // Non-finite values count as not measured
        if !value.is_finite() {
            continue;
        }
        let weight = kind.weight();
        let contribution = value * weight;

        match kind.category() {
            FactorCategory::Behavioral => behavioral_total += contribution,
            FactorCategory::Physiological => physiological_total += contribution,
        }

        factors.push(FactorContribution {
            factor: kind,
            name: kind.display_name().to_string(),
            raw_value: value,
            contribution,
            weight_percent: weight * 100.0,
            category: kind.category(),
        });
    }

    let behavioral_score = penalty_to_score(behavioral_total);
    let physiological_score = penalty_to_score(physiological_total);
    let total_score = behavioral_score * BEHAVIORAL_SHARE + physiological_score * PHYSIOLOGICAL_SHARE;

    // Stable sort keeps fusion order among equal contributions
    factors.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));

    let level = classify_level(total_score);
    let recommendation = recommendation_for(level, &factors);

    ExhaustionResult {
        total_score,
        level,
        behavioral_score,
        physiological_score,
        factors,
        recommendation,
        should_intervene: total_score < INTERVENTION_THRESHOLD,
    }
}

/// Map a fused score onto a severity level (lower bounds inclusive)
pub fn classify_level(total_score: f64) -> ExhaustionLevel {
    if total_score >= 80.0 {
        ExhaustionLevel::Optimal
    } else if total_score >= 60.0 {
        ExhaustionLevel::Mild
    } else if total_score >= 40.0 {
        ExhaustionLevel::Moderate
    } else if total_score >= 20.0 {
        ExhaustionLevel::Severe
    } else {
        ExhaustionLevel::Critical
    }
}

/// Invert a weighted penalty sum into a 0-100 health score
fn penalty_to_score(weighted_penalty: f64) -> f64 {
    (100.0 - weighted_penalty * 100.0).clamp(0.0, 100.0)
}

fn recommendation_for(level: ExhaustionLevel, factors: &[FactorContribution]) -> String {
    let top = factors
        .first()
        .map(|f| f.name.as_str())
        .unwrap_or("multiple factors");

    match level {
        ExhaustionLevel::Optimal => {
            "You're doing great! Maintain your current work rhythm.".to_string()
        }
        ExhaustionLevel::Mild => format!(
            "Light fatigue detected primarily from {}. Consider a short 2-minute break soon.",
            top
        ),
        ExhaustionLevel::Moderate => format!(
            "Moderate fatigue detected. {} is affecting your performance. Take a 5-minute break now.",
            top
        ),
        ExhaustionLevel::Severe => format!(
            "Significant exhaustion from {} and other factors. A 10-15 minute break is strongly recommended.",
            top
        ),
        ExhaustionLevel::Critical => {
            "Critical exhaustion detected! Stop work immediately and take a proper 20+ minute recovery break."
                .to_string()
        }
    }
}
