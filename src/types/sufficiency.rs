//! The sufficiency score: the feedback signal that decides whether to keep
//! iterating or move to report generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A multi-factor composite score, each factor in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SufficiencyScore {
    pub overall: f32,
    pub coverage: f32,
    pub quality: f32,
    pub source_diversity: f32,
    pub freshness: f32,
    pub new_findings_this_iteration: usize,
    pub evaluated_at: DateTime<Utc>,
}

impl SufficiencyScore {
    /// Composite weighting of the four sufficiency factors.
    const COVERAGE_WEIGHT: f32 = 0.35;
    const QUALITY_WEIGHT: f32 = 0.30;
    const DIVERSITY_WEIGHT: f32 = 0.20;
    const FRESHNESS_WEIGHT: f32 = 0.15;
    const MAX_GAP_PENALTY: f32 = 0.2;
    const GAP_PENALTY_PER_GAP: f32 = 0.04;

    /// Compose the overall score from its factors and the current gap count.
    pub fn compose(
        coverage: f32,
        quality: f32,
        source_diversity: f32,
        freshness: f32,
        gap_count: usize,
        new_findings_this_iteration: usize,
    ) -> Self {
        let gap_penalty = (Self::GAP_PENALTY_PER_GAP * gap_count as f32).min(Self::MAX_GAP_PENALTY);
        let overall = (Self::COVERAGE_WEIGHT * coverage
            + Self::QUALITY_WEIGHT * quality
            + Self::DIVERSITY_WEIGHT * source_diversity
            + Self::FRESHNESS_WEIGHT * freshness
            - gap_penalty)
            .clamp(0.0, 1.0);

        Self {
            overall,
            coverage: coverage.clamp(0.0, 1.0),
            quality: quality.clamp(0.0, 1.0),
            source_diversity: source_diversity.clamp(0.0, 1.0),
            freshness: freshness.clamp(0.0, 1.0),
            new_findings_this_iteration,
            evaluated_at: Utc::now(),
        }
    }

    /// `is_sufficient ≡ overall ≥ threshold`.
    pub fn is_sufficient(&self, threshold: f32) -> bool {
        self.overall >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_applies_weights_and_gap_penalty() {
        let score = SufficiencyScore::compose(1.0, 1.0, 1.0, 1.0, 0, 5);
        assert!((score.overall - 1.0).abs() < 1e-6);

        let with_gaps = SufficiencyScore::compose(1.0, 1.0, 1.0, 1.0, 3, 5);
        assert!((with_gaps.overall - 0.88).abs() < 1e-4);
    }

    #[test]
    fn gap_penalty_caps_at_0_2() {
        let score = SufficiencyScore::compose(1.0, 1.0, 1.0, 1.0, 100, 0);
        assert!((score.overall - 0.8).abs() < 1e-4);
    }

    #[test]
    fn overall_never_exceeds_max_factor_plus_small_slack() {
        // Sanity bound: overall <= max(factors) + 0.01
        let score = SufficiencyScore::compose(0.9, 0.2, 0.1, 0.1, 0, 0);
        let max_factor = score
            .coverage
            .max(score.quality)
            .max(score.source_diversity)
            .max(score.freshness);
        assert!(score.overall <= max_factor + 0.01);
    }

    #[test]
    fn is_sufficient_compares_to_threshold() {
        let score = SufficiencyScore::compose(0.9, 0.9, 0.9, 0.9, 0, 0);
        assert!(score.is_sufficient(0.75));
        assert!(!score.is_sufficient(0.99));
    }
}
