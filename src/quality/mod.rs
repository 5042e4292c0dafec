//! Size-adaptive batch quality gate.

use crate::classify::Category;
use crate::config::QualityOverrides;
use crate::types::batch::QualityReport;

/// Acceptance threshold for a batch of `total` documents.
pub fn acceptance_threshold(total: usize) -> f32 {
    match total {
        0..=5 => 0.40,
        6..=10 => 0.50,
        11..=20 => 0.55,
        _ => 0.60,
    }
}

/// Smallest category size that is not flagged as undersized.
pub fn min_category_size(total: usize) -> usize {
    if total <= 10 {
        1
    } else {
        2
    }
}

/// Computes the batch quality score and applies the adaptive thresholds.
#[derive(Debug, Default, Clone)]
pub struct QualityValidator {
    overrides: QualityOverrides,
}

impl QualityValidator {
    pub fn new(overrides: QualityOverrides) -> Self {
        QualityValidator { overrides }
    }

    /// Whole-batch validation. `warnings` carries forward any degradation
    /// notices accumulated earlier in the pipeline.
    pub fn validate(
        &self,
        categories: &[Category],
        total_documents: usize,
        warnings: Vec<String>,
    ) -> QualityReport {
        let threshold_used = self
            .overrides
            .fixed_threshold
            .unwrap_or_else(|| acceptance_threshold(total_documents));
        let min_size = min_category_size(total_documents);

        let populated: Vec<&Category> =
            categories.iter().filter(|c| !c.members.is_empty()).collect();
        let small_category_count = populated
            .iter()
            .filter(|c| c.members.len() < min_size)
            .count();
        let adequately_sized: usize = populated
            .iter()
            .filter(|c| c.members.len() >= min_size)
            .map(|c| c.members.len())
            .sum();

        let sized_score = if total_documents == 0 {
            0.0
        } else {
            adequately_sized as f32 / total_documents as f32
        };
        let spread_score = spread_score(populated.len(), total_documents);

        let w_sized = self.overrides.weight_sized;
        let w_spread = self.overrides.weight_spread;
        let computed_score = (w_sized * sized_score + w_spread * spread_score)
            / (w_sized + w_spread);
        debug_assert!(
            (0.0..=1.0).contains(&computed_score),
            "quality score {computed_score} out of range [0.0, 1.0]"
        );

        QualityReport {
            threshold_used,
            computed_score,
            passed: computed_score >= threshold_used,
            small_category_count,
            total_documents,
            warnings,
        }
    }
}

/// How close the category count sits to an ideal spread of ceil(sqrt(N)):
/// 1.0 at the ideal, 0.0 at either degenerate extreme (one giant category
/// or all singletons).
fn spread_score(category_count: usize, total_documents: usize) -> f32 {
    if total_documents <= 1 {
        return 1.0;
    }
    let ideal = (total_documents as f32).sqrt().ceil() as usize;
    let denom = ideal.saturating_sub(1).max(total_documents.saturating_sub(ideal));
    if denom == 0 {
        return 1.0;
    }
    let deviation = category_count.abs_diff(ideal) as f32 / denom as f32;
    (1.0 - deviation).max(0.0)
}
