use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::features::{FeatureExtractor, Features};
use crate::types::identifiers::DocumentId;

/// Input tuple from the extraction collaborator. Text may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDocument {
    pub id: DocumentId,
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl RawDocument {
    pub fn new(id: DocumentId, text: impl Into<String>) -> Self {
        RawDocument {
            id,
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }
}

/// The batch-scoped unit of classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub raw_text: String,
    pub metadata: BTreeMap<String, String>,
    pub features: Features,
}

impl Document {
    /// Ingest a raw document into its classified form.
    ///
    /// This is the ONLY way to construct a Document; features are extracted
    /// here and immutable afterwards.
    pub fn ingest(raw: RawDocument, extractor: &FeatureExtractor) -> Self {
        let features = extractor.extract(&raw.text);
        Document {
            id: raw.id,
            raw_text: raw.text,
            metadata: raw.metadata,
            features,
        }
    }
}
