//! Progressive document classification and organization engine.
//!
//! `archivist-core` turns extracted document text into a validated set of
//! category assignments: rule-based keyword scoring with a similarity-
//! clustering fallback, a size-adaptive quality gate, and durable
//! cross-run category learning. All operations are deterministic —
//! identical inputs against identical learned state always produce
//! identical assignments.

pub mod classify;
pub mod config;
pub mod document;
pub mod learning;
pub mod organize;
pub mod quality;
pub mod types;
