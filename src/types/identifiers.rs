use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentifierError {
    #[error("Identifier must not be empty or whitespace-only")]
    Empty,
}

/// Opaque, caller-supplied document identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(raw: impl Into<String>) -> Result<Self, IdentifierError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(IdentifierError::Empty);
        }
        Ok(DocumentId(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A category name as shown to callers (and ultimately as a folder name).
///
/// Ordering and equality use the display form; the learning store keys on
/// [`CategoryName::normalized`] so that "Tax Invoices" and "tax  invoices"
/// converge on one persisted entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryName(String);

impl CategoryName {
    pub fn new(raw: impl Into<String>) -> Result<Self, IdentifierError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }
        Ok(CategoryName(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Normalize according to the store key rules: lowercase, interior
    /// whitespace collapsed to single spaces.
    pub fn normalized(&self) -> String {
        self.0
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
