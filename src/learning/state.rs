use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::Category;
use crate::types::identifiers::CategoryName;

/// Durable memory of one confirmed category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryMemory {
    pub display_name: String,
    pub pattern_keywords: BTreeSet<String>,
    pub confirmation_count: u64,
    // informational only
    pub last_seen_batch: DateTime<Utc>,
}

/// Cross-run learning state, keyed by normalized category name.
///
/// `version` is the on-disk snapshot this state was derived from; the
/// store's commit bumps it. Mutation happens only through [`merge`],
/// which is additive: no previously confirmed category is ever removed.
///
/// [`merge`]: LearningState::merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    pub version: u64,
    categories: BTreeMap<String, CategoryMemory>,
}

impl LearningState {
    pub fn empty() -> Self {
        LearningState {
            version: 0,
            categories: BTreeMap::new(),
        }
    }

    pub fn from_parts(version: u64, categories: BTreeMap<String, CategoryMemory>) -> Self {
        LearningState {
            version,
            categories,
        }
    }

    pub fn categories(&self) -> &BTreeMap<String, CategoryMemory> {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Pure additive reducer over one batch observation.
    ///
    /// A matching normalized name unions its pattern keywords and bumps
    /// its confirmation count; a new name is inserted with count 1.
    pub fn merge(&self, observation: &BatchObservation) -> LearningState {
        let mut categories = self.categories.clone();
        for observed in &observation.categories {
            let key = observed.name.normalized();
            match categories.get_mut(&key) {
                Some(memory) => {
                    memory
                        .pattern_keywords
                        .extend(observed.pattern_keywords.iter().cloned());
                    memory.confirmation_count += 1;
                    memory.last_seen_batch = observation.observed_at;
                }
                None => {
                    categories.insert(
                        key,
                        CategoryMemory {
                            display_name: observed.name.as_str().to_string(),
                            pattern_keywords: observed.pattern_keywords.clone(),
                            confirmation_count: 1,
                            last_seen_batch: observation.observed_at,
                        },
                    );
                }
            }
        }
        LearningState {
            version: self.version,
            categories,
        }
    }
}

/// One category as confirmed by a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryObservation {
    pub name: CategoryName,
    pub pattern_keywords: BTreeSet<String>,
}

/// Immutable record of what one run decided; the unit the learning
/// reducer folds over, serializable for replay and audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchObservation {
    pub observed_at: DateTime<Utc>,
    pub categories: Vec<CategoryObservation>,
}

impl BatchObservation {
    /// Record the populated categories of a finished batch, skipping any
    /// whose normalized name matches `exclude` (the review category is
    /// not worth learning).
    pub fn from_categories(
        categories: &[Category],
        exclude: &CategoryName,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let excluded = exclude.normalized();
        let observed = categories
            .iter()
            .filter(|c| !c.members.is_empty() && c.name.normalized() != excluded)
            .map(|c| CategoryObservation {
                name: c.name.clone(),
                pattern_keywords: c.pattern_keywords.clone(),
            })
            .collect();
        BatchObservation {
            observed_at,
            categories: observed,
        }
    }
}
