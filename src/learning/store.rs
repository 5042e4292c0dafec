use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::state::{CategoryMemory, LearningState};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Checksum mismatch: file says {found}, payload hashes to {expected}")]
    Corrupt { expected: String, found: String },
    #[error("Version conflict: state is based on {based_on}, store holds {found}")]
    VersionConflict { based_on: u64, found: u64 },
}

/// On-disk layout of the learning store.
#[derive(Debug, Serialize, Deserialize)]
struct StateFile {
    version: u64,
    updated_at: DateTime<Utc>, // informational only
    checksum: String,
    categories: BTreeMap<String, CategoryMemory>,
}

fn payload_checksum(
    categories: &BTreeMap<String, CategoryMemory>,
) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_vec(categories)?;
    let mut hasher = Sha256::new();
    hasher.update(&payload);
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

/// Durable cross-run category memory.
///
/// `commit` is the only operation that touches the file, and it is atomic:
/// the full state is written to a sibling temp file, fsynced, and renamed
/// over the old one. An optimistic version check serializes concurrent
/// committers; readers take snapshots freely.
#[derive(Debug, Clone)]
pub struct LearningStore {
    path: PathBuf,
}

impl LearningStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LearningStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read-only snapshot of the persisted state.
    ///
    /// A missing file is a normal first run. A corrupt or unreadable file
    /// is logged and rebuilt as empty, never fatal.
    pub fn load(&self) -> LearningState {
        match self.try_load() {
            Ok(Some(state)) => state,
            Ok(None) => LearningState::empty(),
            Err(err) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %err,
                    "learning state unreadable, rebuilding empty"
                );
                LearningState::empty()
            }
        }
    }

    fn try_load(&self) -> Result<Option<LearningState>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(&self.path)?;
        let parsed: StateFile = serde_json::from_reader(file)?;

        // Verify payload integrity (recompute and compare)
        let expected = payload_checksum(&parsed.categories)?;
        if expected != parsed.checksum {
            return Err(StoreError::Corrupt {
                expected,
                found: parsed.checksum,
            });
        }

        Ok(Some(LearningState::from_parts(
            parsed.version,
            parsed.categories,
        )))
    }

    fn on_disk_version(&self) -> u64 {
        if !self.path.exists() {
            return 0;
        }
        fs::File::open(&self.path)
            .ok()
            .and_then(|f| serde_json::from_reader::<_, StateFile>(f).ok())
            .map(|parsed| parsed.version)
            .unwrap_or(0)
    }

    /// Atomically replace the persisted state.
    ///
    /// Fails with `VersionConflict` if another batch committed since
    /// `state` was loaded; the file on disk is untouched in every failure
    /// case. Returns the committed state with its new version.
    pub fn commit(&self, state: &LearningState) -> Result<LearningState, StoreError> {
        let found = self.on_disk_version();
        if found != state.version {
            return Err(StoreError::VersionConflict {
                based_on: state.version,
                found,
            });
        }

        let next_version = state.version + 1;
        let file = StateFile {
            version: next_version,
            updated_at: Utc::now(),
            checksum: payload_checksum(state.categories())?,
            categories: state.categories().clone(),
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension(format!("tmp.{next_version}"));
        {
            let f = fs::File::create(&temp_path)?;
            serde_json::to_writer_pretty(&f, &file)?;
            f.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            version = next_version,
            categories = file.categories.len(),
            "learning state committed"
        );

        Ok(LearningState::from_parts(next_version, file.categories))
    }
}
