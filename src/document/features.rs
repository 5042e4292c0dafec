use serde::{Deserialize, Serialize};

use super::lexicon::Lexicon;

/// Normalized feature set shared by every downstream classifier.
///
/// `keywords` are lowercased alphabetic surface tokens with stop words
/// removed; `lemmas` are the same tokens reduced to base form; `entities`
/// are coarse capitalized spans from the raw text. Occurrence order and
/// multiplicity are preserved (scoring counts hits).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Features {
    pub keywords: Vec<String>,
    pub lemmas: Vec<String>,
    pub entities: Vec<String>,
}

impl Features {
    /// Sentinel for empty or whitespace-only text.
    pub fn empty() -> Self {
        Features::default()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty() && self.lemmas.is_empty() && self.entities.is_empty()
    }

    pub fn term_count(&self) -> usize {
        self.keywords.len()
    }
}

/// Pure text → [`Features`] conversion.
///
/// Construction never fails: when the lexicon is unavailable the extractor
/// degrades to plain lowercasing/tokenization (identity lemmas, no stop
/// list) and reports itself degraded so the batch can carry a warning.
#[derive(Debug, Clone, Copy)]
pub struct FeatureExtractor {
    lexicon: Option<&'static Lexicon>,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor {
    pub fn new() -> Self {
        FeatureExtractor {
            lexicon: Lexicon::shared(),
        }
    }

    /// Reduced-accuracy extractor used when the lexicon cannot be loaded.
    pub fn degraded() -> Self {
        FeatureExtractor { lexicon: None }
    }

    pub fn is_degraded(&self) -> bool {
        self.lexicon.is_none()
    }

    pub fn extract(&self, raw_text: &str) -> Features {
        if raw_text.trim().is_empty() {
            return Features::empty();
        }

        let mut keywords = Vec::new();
        let mut lemmas = Vec::new();
        for token in raw_text
            .split(|c: char| !c.is_alphabetic())
            .filter(|t| t.len() >= 2)
        {
            let token = token.to_lowercase();
            if let Some(lexicon) = self.lexicon {
                if lexicon.is_stop_word(&token) {
                    continue;
                }
                lemmas.push(lexicon.lemmatize(&token));
            } else {
                lemmas.push(token.clone());
            }
            keywords.push(token);
        }

        Features {
            keywords,
            lemmas,
            entities: extract_entities(raw_text),
        }
    }
}

/// Coarse named-entity spans: runs of two or more capitalized words, plus
/// standalone all-caps acronyms.
fn extract_entities(raw_text: &str) -> Vec<String> {
    let mut entities = Vec::new();
    let mut run: Vec<&str> = Vec::new();

    for word in raw_text.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_alphabetic());
        if trimmed.len() >= 2 && is_capitalized(trimmed) {
            run.push(trimmed);
            continue;
        }
        flush_run(&mut run, &mut entities);
        if trimmed.len() >= 2 && is_acronym(trimmed) {
            entities.push(trimmed.to_string());
        }
    }
    flush_run(&mut run, &mut entities);
    entities
}

fn flush_run(run: &mut Vec<&str>, entities: &mut Vec<String>) {
    if run.len() >= 2 {
        entities.push(run.join(" "));
    }
    run.clear();
}

fn is_capitalized(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => chars.all(|c| c.is_lowercase()),
        _ => false,
    }
}

fn is_acronym(word: &str) -> bool {
    word.chars().all(|c| c.is_uppercase())
}
