//! Checkpoint storage for the batch Progress State.
//!
//! The file store writes the whole document to a sibling temp file and renames it over the
//! target, so a crash mid-write leaves the previous state intact.

use crate::error::StorageError;
use crate::orchestrator::progress::{ProgressState, PROGRESS_STATE_VERSION};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub trait CheckpointStore: Send + Sync {
    /// The persisted state, or `None` when nothing has been saved.
    fn load(&self) -> Result<Option<ProgressState>, StorageError>;

    fn save(&self, state: &ProgressState) -> Result<(), StorageError>;

    /// Move the current state out of the way after a fully successful run.
    /// Returns where it went, or `None` when there was nothing to archive.
    fn archive(&self) -> Result<Option<PathBuf>, StorageError>;
}

pub struct FileCheckpointStore {
    path: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn archive_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("progress");
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        self.path
            .with_file_name(format!("{}.completed-{}.json", stem, stamp))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn load(&self) -> Result<Option<ProgressState>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        let found = value
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                StorageError::InvalidData(format!(
                    "checkpoint {} has no version",
                    self.path.display()
                ))
            })?;
        if found != u64::from(PROGRESS_STATE_VERSION) {
            return Err(StorageError::UnsupportedVersion {
                document: self.path.display().to_string(),
                found: u32::try_from(found).unwrap_or(u32::MAX),
                expected: PROGRESS_STATE_VERSION,
            });
        }
        let state: ProgressState = serde_json::from_value(value)?;
        debug!(path = %self.path.display(), groups = state.groups.len(), "checkpoint loaded");
        Ok(Some(state))
    }

    fn save(&self, state: &ProgressState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_vec_pretty(state)?;
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json)?;
        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            StorageError::IoError(e)
        })?;
        Ok(())
    }

    fn archive(&self) -> Result<Option<PathBuf>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let target = self.archive_path();
        fs::rename(&self.path, &target)?;
        info!(from = %self.path.display(), to = %target.display(), "checkpoint archived");
        Ok(Some(target))
    }
}
