use std::collections::BTreeMap;

use crate::config::{CategoryRule, RuleTable};
use crate::document::features::Features;
use crate::document::lexicon::Lexicon;
use crate::types::identifiers::CategoryName;

/// Weight of a surface-form keyword hit.
pub const RAW_HIT_WEIGHT: f32 = 1.0;
/// Weight of a lemma hit. Slightly above raw: lemma matches catch
/// morphological variants ("invoices" vs "invoice") raw matches miss.
pub const LEMMA_HIT_WEIGHT: f32 = 1.2;

/// Match counts for one document against one category rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHits {
    pub raw_matches: usize,
    pub lemma_matches: usize,
    pub total_terms: usize,
}

pub trait PatternScorer {
    fn hits(&self, features: &Features, rule: &CategoryRule) -> PatternHits;

    fn score_value(&self, hits: &PatternHits, weight: f32) -> f32 {
        (hits.raw_matches as f32 * RAW_HIT_WEIGHT + hits.lemma_matches as f32 * LEMMA_HIT_WEIGHT)
            * weight
    }

    fn confidence(&self, hits: &PatternHits) -> f32 {
        if hits.total_terms == 0 {
            return 0.0;
        }
        let confidence =
            (hits.raw_matches + hits.lemma_matches) as f32 / hits.total_terms as f32;
        confidence.min(1.0)
    }
}

/// Default scorer: counts configured keywords in the surface-token list
/// and their lemmatized forms in the lemma list.
#[derive(Debug, Clone, Copy)]
pub struct KeywordLemmaScorer {
    lexicon: Option<&'static Lexicon>,
}

impl Default for KeywordLemmaScorer {
    fn default() -> Self {
        KeywordLemmaScorer {
            lexicon: Lexicon::shared(),
        }
    }
}

impl PatternScorer for KeywordLemmaScorer {
    fn hits(&self, features: &Features, rule: &CategoryRule) -> PatternHits {
        let mut raw_matches = 0;
        let mut lemma_matches = 0;
        for keyword in &rule.keywords {
            raw_matches += features.keywords.iter().filter(|t| *t == keyword).count();

            let lemma_keyword = match self.lexicon {
                Some(lexicon) => lexicon.lemmatize(keyword),
                None => keyword.clone(),
            };
            lemma_matches += features
                .lemmas
                .iter()
                .filter(|t| **t == lemma_keyword)
                .count();
        }
        PatternHits {
            raw_matches,
            lemma_matches,
            total_terms: features.term_count(),
        }
    }
}

/// A confident rule-stage decision.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    pub category: CategoryName,
    pub score: f32,
    pub confidence: f32,
}

/// Tagged rule-stage result; the orchestrator branches on this
/// exhaustively instead of sniffing sentinel values.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    Matched(RuleMatch),
    NeedsRefinement,
}

#[derive(Debug)]
pub struct RuleClassifier<S = KeywordLemmaScorer> {
    scorer: S,
}

impl Default for RuleClassifier<KeywordLemmaScorer> {
    fn default() -> Self {
        RuleClassifier {
            scorer: KeywordLemmaScorer::default(),
        }
    }
}

impl<S: PatternScorer> RuleClassifier<S> {
    pub fn new(scorer: S) -> Self {
        RuleClassifier { scorer }
    }

    /// Score every category in the table. Zero-score categories are
    /// included so callers can inspect the full distribution.
    pub fn score(&self, features: &Features, table: &RuleTable) -> BTreeMap<CategoryName, f32> {
        table
            .rules()
            .iter()
            .map(|rule| {
                let hits = self.scorer.hits(features, rule);
                (rule.name.clone(), self.scorer.score_value(&hits, rule.weight))
            })
            .collect()
    }

    /// Pick the winning category, or defer to refinement.
    ///
    /// Ties break to the lexically earlier category name: candidates are
    /// visited in name order and only a strictly greater score displaces
    /// the current best.
    pub fn decide(&self, features: &Features, table: &RuleTable) -> RuleOutcome {
        let mut candidates: BTreeMap<CategoryName, (f32, PatternHits)> = BTreeMap::new();
        for rule in table.rules() {
            let hits = self.scorer.hits(features, rule);
            let score = self.scorer.score_value(&hits, rule.weight);
            candidates.insert(rule.name.clone(), (score, hits));
        }

        let mut best: Option<(&CategoryName, f32, &PatternHits)> = None;
        for (name, (score, hits)) in &candidates {
            if *score > 0.0 && best.map_or(true, |(_, s, _)| *score > s) {
                best = Some((name, *score, hits));
            }
        }

        match best {
            Some((name, score, hits)) => RuleOutcome::Matched(RuleMatch {
                category: name.clone(),
                score,
                confidence: self.scorer.confidence(hits),
            }),
            None => RuleOutcome::NeedsRefinement,
        }
    }
}
