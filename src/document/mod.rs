pub mod document;
pub mod features;
pub mod lexicon;

pub use document::{Document, RawDocument};
pub use features::{FeatureExtractor, Features};
pub use lexicon::{Lexicon, LexiconError};
