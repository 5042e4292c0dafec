use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::identifiers::{CategoryName, DocumentId};

/// How a document ended up in its category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationMethod {
    /// Matched the pattern table directly.
    Rule,
    /// Resolved by the similarity refiner.
    Similarity,
    /// Parked in the configured review category.
    Fallback,
}

/// One per document per batch; produced once, immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub document_id: DocumentId,
    pub category_name: CategoryName,
    pub confidence: f32,
    pub method: ClassificationMethod,
}

/// Batch-level quality verdict.
///
/// `warnings` carries the non-fatal degradations the batch ran under
/// (degraded lexicon, accept-with-warning policy, persistence failure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub threshold_used: f32,
    pub computed_score: f32,
    pub passed: bool,
    pub small_category_count: usize,
    pub total_documents: usize,
    pub warnings: Vec<String>,
}

/// Pipeline position a batch terminated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStage {
    Received,
    FeaturesExtracted,
    RuleScored,
    Refined,
    SkipRefine,
    Validated,
    Accepted,
    Rejected,
    Persisted,
}

/// The final output of one organization run.
///
/// `assignments` is exactly the mapping handed to the folder
/// materialization collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganizeResult {
    pub assignments: BTreeMap<DocumentId, CategoryName>,
    pub results: Vec<ClassificationResult>,
    pub quality: QualityReport,
    pub stage: BatchStage,
    pub learning_updated: bool,
}

impl OrganizeResult {
    /// Category → sorted member ids, for the materialization collaborator.
    pub fn folder_plan(&self) -> BTreeMap<CategoryName, Vec<DocumentId>> {
        let mut plan: BTreeMap<CategoryName, Vec<DocumentId>> = BTreeMap::new();
        for (doc, category) in &self.assignments {
            plan.entry(category.clone()).or_default().push(doc.clone());
        }
        plan
    }
}
