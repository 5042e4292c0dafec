pub mod batch;
pub mod identifiers;

pub use batch::{
    BatchStage, ClassificationMethod, ClassificationResult, OrganizeResult, QualityReport,
};
pub use identifiers::{CategoryName, DocumentId, IdentifierError};
