//! Bundle spool: generated bundles staged on disk between generation and import.
//!
//! One JSON document per group at `<dir>/<group>.json`. The document carries a blake3
//! digest of its bundles so a truncated or hand-edited file is refused at import time
//! instead of being written into the datastore.

use crate::content::ContentBundle;
use crate::error::{PipelineError, StorageError};
use blake3::Hasher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SPOOL_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SpoolDocument {
    version: u32,
    group: String,
    written_at: DateTime<Utc>,
    digest: String,
    bundles: Vec<ContentBundle>,
}

fn digest(group: &str, bundles: &[ContentBundle]) -> Result<String, StorageError> {
    let mut hasher = Hasher::new();
    hasher.update(b"group:");
    hasher.update(group.as_bytes());
    hasher.update(b"bundles:");
    hasher.update(&serde_json::to_vec(bundles)?);
    Ok(hex::encode(hasher.finalize().as_bytes()))
}

pub struct BundleSpool {
    dir: PathBuf,
}

impl BundleSpool {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, group: &str) -> PathBuf {
        self.dir.join(format!("{}.json", group))
    }

    /// Replace the group's spooled bundles.
    pub fn write(&self, group: &str, bundles: &[ContentBundle]) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.dir).map_err(StorageError::from)?;
        let document = SpoolDocument {
            version: SPOOL_VERSION,
            group: group.to_string(),
            written_at: Utc::now(),
            digest: digest(group, bundles)?,
            bundles: bundles.to_vec(),
        };
        let path = self.path_for(group);
        let temp = path.with_extension("json.tmp");
        let json = serde_json::to_vec_pretty(&document).map_err(StorageError::from)?;
        fs::write(&temp, json).map_err(StorageError::from)?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(StorageError::IoError(e).into());
        }
        debug!(group = %group, bundles = bundles.len(), path = %path.display(), "bundles spooled");
        Ok(path)
    }

    pub fn read(&self, group: &str) -> Result<Vec<ContentBundle>, PipelineError> {
        let path = self.path_for(group);
        if !path.exists() {
            return Err(PipelineError::Spool(format!(
                "no spooled bundles for group {} at {}",
                group,
                path.display()
            )));
        }
        let text = fs::read_to_string(&path).map_err(StorageError::from)?;
        let document: SpoolDocument = serde_json::from_str(&text).map_err(|e| {
            PipelineError::Spool(format!("unreadable spool {}: {}", path.display(), e))
        })?;
        if document.version != SPOOL_VERSION {
            return Err(StorageError::UnsupportedVersion {
                document: path.display().to_string(),
                found: document.version,
                expected: SPOOL_VERSION,
            }
            .into());
        }
        if document.group != group {
            return Err(PipelineError::Spool(format!(
                "spool {} belongs to group {}",
                path.display(),
                document.group
            )));
        }
        if digest(group, &document.bundles)? != document.digest {
            return Err(PipelineError::Spool(format!(
                "spool {} failed its integrity check",
                path.display()
            )));
        }
        Ok(document.bundles)
    }

    /// Drop the group's spool once its bundles are imported.
    pub fn remove(&self, group: &str) -> Result<(), StorageError> {
        let path = self.path_for(group);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
