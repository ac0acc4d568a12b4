//! On-disk snapshot of the watch list.
//!
//! Written once at shutdown and read once at startup. A title stored as
//! finished has already been notified, so the file is the only record of
//! which completions were delivered.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::watcher::{FilterMetadata, WatchList};

pub(crate) const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub(crate) enum SnapshotError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("snapshot worker failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(rename = "v")]
    pub(crate) version: u32,
    pub(crate) saved_at: DateTime<Utc>,
    /// `None` until the initial list has been built successfully.
    pub(crate) watch_list: Option<WatchList>,
    /// Ids that were already finished when the list was built.
    #[serde(default)]
    pub(crate) skipped: BTreeSet<u32>,
    #[serde(default)]
    pub(crate) filters: FilterMetadata,
}

impl Snapshot {
    pub(crate) fn new(watch_list: Option<WatchList>, filters: FilterMetadata) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            watch_list,
            skipped: BTreeSet::new(),
            filters,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no snapshot has been written yet.
    pub(crate) fn load(&self) -> Result<Option<Snapshot>, SnapshotError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };
        let snapshot: Snapshot = serde_json::from_str(&raw)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(snapshot.version));
        }
        Ok(Some(snapshot))
    }

    /// Replaces the snapshot atomically: write a sibling temp file, then rename.
    pub(crate) fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| SnapshotError::Io {
                    path: parent.to_path_buf(),
                    source: err,
                })?;
            }
        }
        let json = serde_json::to_vec_pretty(snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|err| SnapshotError::Io {
            path: tmp_path.clone(),
            source: err,
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|err| self.io_error(err))
    }

    fn io_error(&self, source: std::io::Error) -> SnapshotError {
        SnapshotError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
