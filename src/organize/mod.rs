//! End-to-end batch organization pipeline.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use thiserror::Error;

use crate::classify::{
    Category, CategoryOrigin, KeywordLemmaScorer, RuleClassifier, RuleOutcome, SimilarityRefiner,
};
use crate::config::{FailurePolicy, OrganizeConfig};
use crate::document::document::{Document, RawDocument};
use crate::document::features::FeatureExtractor;
use crate::learning::{BatchObservation, LearningStore};
use crate::quality::QualityValidator;
use crate::types::batch::{
    BatchStage, ClassificationMethod, ClassificationResult, OrganizeResult,
};
use crate::types::identifiers::{CategoryName, DocumentId};

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("Batch must contain at least one document")]
    EmptyBatch,
    #[error("Duplicate document ID: {0}")]
    DuplicateDocumentId(String),
}

/// Composes extraction, rule scoring, refinement, validation, and
/// learning into the single public entry point.
///
/// The pipeline is `Received → FeaturesExtracted → RuleScored →
/// {Refined | SkipRefine} → Validated → {Accepted → Persisted} |
/// Rejected`. Learning mutations are buffered for the whole batch and
/// committed only after acceptance, so a failed or rejected batch leaves
/// the persisted state untouched.
pub struct Organizer {
    config: OrganizeConfig,
    extractor: FeatureExtractor,
    classifier: RuleClassifier<KeywordLemmaScorer>,
    store: Option<LearningStore>,
}

impl Organizer {
    pub fn new(config: OrganizeConfig) -> Self {
        Organizer {
            config,
            extractor: FeatureExtractor::new(),
            classifier: RuleClassifier::default(),
            store: None,
        }
    }

    /// Attach a durable learning store; without one, learning is
    /// batch-local only.
    pub fn with_store(mut self, store: LearningStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn organize(&self, batch: Vec<RawDocument>) -> Result<OrganizeResult, OrganizeError> {
        // 0. Received: order and uniqueness
        if batch.is_empty() {
            return Err(OrganizeError::EmptyBatch);
        }
        let mut batch = batch;
        batch.sort_by(|a, b| a.id.cmp(&b.id));
        for pair in batch.windows(2) {
            if pair[0].id == pair[1].id {
                return Err(OrganizeError::DuplicateDocumentId(
                    pair[0].id.as_str().to_string(),
                ));
            }
        }
        let total = batch.len();
        let mut warnings = Vec::new();

        // Read-only learning snapshot; seeds the rule table when enabled
        let learned = self.store.as_ref().map(|s| s.load());
        let table = match &learned {
            Some(state) if self.config.seed_learned_rules && !state.is_empty() => {
                self.config.rules.with_learned(state)
            }
            _ => self.config.rules.clone(),
        };

        // 1. FeaturesExtracted
        if self.extractor.is_degraded() {
            warnings.push(
                "linguistic lexicon unavailable; matching on plain tokens only".to_string(),
            );
        }
        let documents: Vec<Document> = batch
            .into_iter()
            .map(|raw| Document::ingest(raw, &self.extractor))
            .collect();
        tracing::debug!(stage = ?BatchStage::FeaturesExtracted, documents = total);

        // 2. RuleScored
        let configured: BTreeSet<String> = self
            .config
            .rules
            .rules()
            .iter()
            .map(|r| r.name.normalized())
            .collect();
        let mut categories: Vec<Category> = table
            .rules()
            .iter()
            .enumerate()
            .map(|(order, rule)| {
                let origin = if configured.contains(&rule.name.normalized()) {
                    CategoryOrigin::Rule
                } else {
                    CategoryOrigin::Learned
                };
                let mut category = Category::new(rule.name.clone(), origin, order);
                category.pattern_keywords = rule.keywords.iter().cloned().collect();
                category
            })
            .collect();

        let mut rule_results: BTreeMap<DocumentId, (CategoryName, f32)> = BTreeMap::new();
        let mut unresolved: Vec<DocumentId> = Vec::new();
        let mut confidence_sum = 0.0f32;
        for doc in &documents {
            match self.classifier.decide(&doc.features, &table) {
                RuleOutcome::Matched(matched) => {
                    let normalized = matched.category.normalized();
                    if let Some(category) = categories
                        .iter_mut()
                        .find(|c| c.name.normalized() == normalized)
                    {
                        category.members.push(doc.id.clone());
                    }
                    confidence_sum += matched.confidence;
                    rule_results.insert(doc.id.clone(), (matched.category, matched.confidence));
                }
                RuleOutcome::NeedsRefinement => unresolved.push(doc.id.clone()),
            }
        }
        tracing::debug!(
            stage = ?BatchStage::RuleScored,
            matched = rule_results.len(),
            unresolved = unresolved.len()
        );

        // 3. Refined | SkipRefine
        let matched_count = total - unresolved.len();
        let mean_confidence = if matched_count == 0 {
            0.0
        } else {
            confidence_sum / matched_count as f32
        };
        let needs_refine = !unresolved.is_empty() || mean_confidence < self.config.refine.trigger;

        let mut rename: BTreeMap<String, CategoryName> = BTreeMap::new();
        let resolved;
        if needs_refine {
            let refiner = SimilarityRefiner::new(self.config.refine.clone());
            let outcome = refiner.refine(
                &documents,
                categories,
                &unresolved,
                &self.config.fallback_category,
            );
            for (absorbed, into) in &outcome.merges {
                rename.insert(absorbed.normalized(), into.clone());
            }
            categories = outcome.categories;
            resolved = outcome.resolved;
            tracing::debug!(stage = ?BatchStage::Refined, resolved = resolved.len());
        } else {
            resolved = BTreeMap::new();
            tracing::debug!(stage = ?BatchStage::SkipRefine, mean_confidence);
        }

        // Per-document results, with merge renames applied to rule hits
        let mut results: Vec<ClassificationResult> = Vec::with_capacity(total);
        for doc in &documents {
            if let Some((category, confidence)) = rule_results.get(&doc.id) {
                let category = rename
                    .get(&category.normalized())
                    .cloned()
                    .unwrap_or_else(|| category.clone());
                results.push(ClassificationResult {
                    document_id: doc.id.clone(),
                    category_name: category,
                    confidence: *confidence,
                    method: ClassificationMethod::Rule,
                });
            } else if let Some(assignment) = resolved.get(&doc.id) {
                results.push(ClassificationResult {
                    document_id: doc.id.clone(),
                    category_name: assignment.category.clone(),
                    confidence: assignment.confidence,
                    method: assignment.method,
                });
            }
        }
        debug_assert_eq!(results.len(), total, "every document must be assigned");
        debug_assert_eq!(
            categories.iter().map(|c| c.members.len()).sum::<usize>(),
            total,
            "category member counts must sum to the batch size"
        );

        // 4. Validated
        let mut report =
            QualityValidator::new(self.config.quality.clone()).validate(&categories, total, warnings);
        tracing::debug!(
            stage = ?BatchStage::Validated,
            score = report.computed_score,
            threshold = report.threshold_used,
            passed = report.passed
        );

        // 5. Accepted | Rejected
        let accepted = report.passed
            || matches!(self.config.policy, FailurePolicy::AcceptWithWarning);
        if !accepted {
            // Terminal failure: everything parks in the fallback category
            // and learning is left untouched.
            tracing::warn!(
                score = report.computed_score,
                threshold = report.threshold_used,
                "batch rejected by quality gate"
            );
            let fallback = &self.config.fallback_category;
            let results: Vec<ClassificationResult> = documents
                .iter()
                .map(|doc| ClassificationResult {
                    document_id: doc.id.clone(),
                    category_name: fallback.clone(),
                    confidence: 0.0,
                    method: ClassificationMethod::Fallback,
                })
                .collect();
            let assignments = results
                .iter()
                .map(|r| (r.document_id.clone(), r.category_name.clone()))
                .collect();
            return Ok(OrganizeResult {
                assignments,
                results,
                quality: report,
                stage: BatchStage::Rejected,
                learning_updated: false,
            });
        }
        if !report.passed {
            let warning = format!(
                "quality score {:.2} below threshold {:.2}; accepted by policy",
                report.computed_score, report.threshold_used
            );
            tracing::warn!("{warning}");
            report.warnings.push(warning);
        }

        // 6. Persisted (best effort; classification survives a failed commit)
        let mut stage = BatchStage::Accepted;
        let mut learning_updated = false;
        if let (Some(store), Some(state)) = (&self.store, &learned) {
            let observation = BatchObservation::from_categories(
                &categories,
                &self.config.fallback_category,
                Utc::now(),
            );
            match store.commit(&state.merge(&observation)) {
                Ok(_) => {
                    stage = BatchStage::Persisted;
                    learning_updated = true;
                }
                Err(err) => {
                    let warning = format!("learning state not persisted: {err}");
                    tracing::warn!("{warning}");
                    report.warnings.push(warning);
                }
            }
        }

        let assignments: BTreeMap<DocumentId, CategoryName> = results
            .iter()
            .map(|r| (r.document_id.clone(), r.category_name.clone()))
            .collect();

        Ok(OrganizeResult {
            assignments,
            results,
            quality: report,
            stage,
            learning_updated,
        })
    }
}
