//! On-disk snapshot of the local store.
//!
//! One JSON document under `.tudu/snapshot/` holding both entity families,
//! written atomically (temp file + rename). Lists and items always come from
//! the same save. A snapshot, once present, is the only source of truth for
//! the store until it is cleared.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::LocalStore;
use crate::error::ErrorCode;
use crate::model::{Container, Member};

pub const SNAPSHOT_FILE: &str = "tudu.json";

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is not a valid snapshot: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SnapshotError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } | Self::Corrupt { .. } => ErrorCode::SnapshotCorrupt,
            Self::Write { .. } => ErrorCode::SnapshotWriteFailed,
        }
    }
}

#[derive(Serialize)]
struct DocumentRef<'a> {
    lists: &'a [Container],
    items: &'a [Member],
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    lists: Vec<Container>,
    #[serde(default)]
    items: Vec<Member>,
}

/// Snapshot location plus load/save helpers.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self) -> PathBuf {
        self.dir.join(SNAPSHOT_FILE)
    }

    fn tmp_path(&self) -> PathBuf {
        self.path().with_extension("json.tmp")
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Load the store, or `None` when no snapshot has been written yet.
    ///
    /// A leftover temp file from an interrupted save is ignored; the last
    /// completed save wins.
    pub fn load(&self) -> Result<Option<LocalStore>, SnapshotError> {
        let path = self.path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(SnapshotError::Read { path, source }),
        };
        let doc: Document = serde_json::from_slice(&bytes)
            .map_err(|source| SnapshotError::Corrupt { path, source })?;
        tracing::debug!(
            lists = doc.lists.len(),
            items = doc.items.len(),
            dir = %self.dir.display(),
            "snapshot loaded"
        );
        Ok(Some(LocalStore::from_records(doc.lists, doc.items)))
    }

    pub fn save(&self, store: &LocalStore) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir).map_err(|source| SnapshotError::Write {
            path: self.dir.clone(),
            source,
        })?;
        let doc = DocumentRef {
            lists: store.containers(),
            items: store.members(),
        };
        let body = serde_json::to_vec_pretty(&doc).map_err(|err| SnapshotError::Write {
            path: self.path(),
            source: io::Error::other(err),
        })?;

        let tmp = self.tmp_path();
        fs::write(&tmp, body).map_err(|source| SnapshotError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, self.path()).map_err(|source| SnapshotError::Write {
            path: self.path(),
            source,
        })
    }

    /// Delete the snapshot and any leftover temp file. Returns whether a
    /// snapshot was removed.
    pub fn clear(&self) -> Result<bool, SnapshotError> {
        let removed = remove_if_present(self.path())?;
        remove_if_present(self.tmp_path())?;
        Ok(removed)
    }
}

fn remove_if_present(path: PathBuf) -> Result<bool, SnapshotError> {
    match fs::remove_file(&path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(SnapshotError::Write { path, source }),
    }
}
