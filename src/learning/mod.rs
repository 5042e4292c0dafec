pub mod state;
pub mod store;

pub use state::{BatchObservation, CategoryMemory, CategoryObservation, LearningState};
pub use store::{LearningStore, StoreError};
