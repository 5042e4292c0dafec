//! Enumerated configuration surface.
//!
//! Everything the engine can be tuned with is an explicit struct validated
//! at load time. Free-form lookups are deliberately absent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::learning::LearningState;
use crate::types::identifiers::CategoryName;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Rule table must contain at least one category")]
    EmptyTable,
    #[error("Duplicate category in rule table: {0}")]
    DuplicateCategory(String),
    #[error("Category '{0}' has no pattern keywords")]
    NoKeywords(String),
    #[error("Category '{category}' has non-positive weight {weight}")]
    InvalidWeight { category: String, weight: f32 },
    #[error("Value {value} for {field} is outside [0, 1]")]
    OutOfRange { field: &'static str, value: f32 },
    #[error("Quality score weights must not both be zero")]
    ZeroWeights,
}

/// One category → pattern mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: CategoryName,
    pub keywords: Vec<String>,
    pub weight: f32,
}

/// The configured category → pattern table, validated on construction.
///
/// Order is meaningful: earlier rules are considered earlier-created when
/// the refiner merges near-duplicate categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    rules: Vec<CategoryRule>,
}

impl RuleTable {
    pub fn from_rules(rules: Vec<CategoryRule>) -> Result<Self, ConfigError> {
        if rules.is_empty() {
            return Err(ConfigError::EmptyTable);
        }

        let mut seen = std::collections::BTreeSet::new();
        let mut validated = Vec::with_capacity(rules.len());
        for rule in rules {
            let key = rule.name.normalized();
            if !seen.insert(key.clone()) {
                return Err(ConfigError::DuplicateCategory(key));
            }
            if rule.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(ConfigError::NoKeywords(rule.name.as_str().to_string()));
            }
            if rule.weight <= 0.0 {
                return Err(ConfigError::InvalidWeight {
                    category: rule.name.as_str().to_string(),
                    weight: rule.weight,
                });
            }
            // Keywords are matched lowercase
            let keywords = rule
                .keywords
                .iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect();
            validated.push(CategoryRule {
                name: rule.name,
                keywords,
                weight: rule.weight,
            });
        }

        Ok(RuleTable { rules: validated })
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    /// Extend the table with previously confirmed categories so cross-run
    /// learning feeds back into classification.
    ///
    /// Learned rules never shadow configured ones, and their weight grows
    /// with confirmation count but is capped below a configured rule's
    /// default weight until repeatedly confirmed.
    pub fn with_learned(&self, state: &LearningState) -> RuleTable {
        let configured: std::collections::BTreeSet<String> =
            self.rules.iter().map(|r| r.name.normalized()).collect();

        let mut rules = self.rules.clone();
        for (key, memory) in state.categories() {
            if configured.contains(key) {
                continue;
            }
            let Ok(name) = CategoryName::new(memory.display_name.clone()) else {
                continue;
            };
            let weight = (0.5 + 0.1 * memory.confirmation_count as f32).min(1.0);
            rules.push(CategoryRule {
                name,
                keywords: memory.pattern_keywords.iter().cloned().collect(),
                weight,
            });
        }
        RuleTable { rules }
    }
}

/// Overrides for the size-adaptive quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityOverrides {
    /// When set, replaces the size-adaptive acceptance threshold with a
    /// fixed one (legacy behavior, kept for regression comparison).
    pub fixed_threshold: Option<f32>,
    /// Weight of the "documents in adequately sized categories" sub-score.
    pub weight_sized: f32,
    /// Weight of the category-count spread sub-score.
    pub weight_spread: f32,
}

impl Default for QualityOverrides {
    fn default() -> Self {
        Self {
            fixed_threshold: None,
            weight_sized: 0.5,
            weight_spread: 0.5,
        }
    }
}

impl QualityOverrides {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.fixed_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::OutOfRange {
                    field: "fixed_threshold",
                    value: t,
                });
            }
        }
        if self.weight_sized < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "weight_sized",
                value: self.weight_sized,
            });
        }
        if self.weight_spread < 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "weight_spread",
                value: self.weight_spread,
            });
        }
        if self.weight_sized + self.weight_spread == 0.0 {
            return Err(ConfigError::ZeroWeights);
        }
        Ok(())
    }
}

/// Tuning for the similarity refinement stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineConfig {
    /// Mutual cosine similarity required to cluster two documents.
    pub merge_threshold: f32,
    /// Fraction of both categories' members that must co-cluster before
    /// two rule categories are merged into one.
    pub category_overlap: f32,
    /// Mean rule confidence below which refinement runs even with no
    /// unmatched documents.
    pub trigger: f32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 0.75,
            category_overlap: 0.8,
            trigger: 0.35,
        }
    }
}

impl RefineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("merge_threshold", self.merge_threshold),
            ("category_overlap", self.category_overlap),
            ("trigger", self.trigger),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }
        Ok(())
    }
}

/// What to do with a batch that fails the quality gate.
///
/// There is no default: the caller must choose, so the reject-vs-warn
/// decision is always explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Park every document in the fallback category; learning is not
    /// updated.
    Reject,
    /// Keep the assignments, log a warning, and persist.
    AcceptWithWarning,
}

/// Full configuration for one [`crate::organize::Organizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizeConfig {
    pub rules: RuleTable,
    pub policy: FailurePolicy,
    /// Where rejected or unresolvable documents are parked.
    pub fallback_category: CategoryName,
    pub refine: RefineConfig,
    pub quality: QualityOverrides,
    /// Seed the rule table from persisted learning state before scoring.
    pub seed_learned_rules: bool,
}

impl OrganizeConfig {
    pub fn new(rules: RuleTable, policy: FailurePolicy) -> Self {
        Self {
            rules,
            policy,
            fallback_category: CategoryName::new("review").expect("static name"),
            refine: RefineConfig::default(),
            quality: QualityOverrides::default(),
            seed_learned_rules: true,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.refine.validate()?;
        self.quality.validate()?;
        Ok(())
    }
}
