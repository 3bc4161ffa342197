//! The `.tudu/` directory: config, snapshot, and the workspace lock.
//!
//! ```text
//! .tudu/
//!   config.toml
//!   lock
//!   snapshot/
//!     tudu.json
//! ```
//!
//! Every command that reads or writes the store does so under the lock, so a
//! snapshot is never observed half-written by another `tudu` process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tudu_core::config::{ProjectConfig, WORKSPACE_DIR, load_project_config};
use tudu_core::error::{ErrorCode, StoreError};
use tudu_core::lock::{LockError, WorkspaceLock};
use tudu_core::store::LocalStore;
use tudu_core::store::snapshot::{SnapshotError, SnapshotStore};

use crate::remote::HttpRemote;

pub const SNAPSHOT_DIR: &str = "snapshot";
pub const LOCK_FILE: &str = "lock";

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("no .tudu workspace at or above {}", .0.display())]
    NotInitialized(PathBuf),

    #[error("{0:#}")]
    Config(anyhow::Error),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkspaceError {
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized(_) => ErrorCode::NotInitialized,
            Self::Config(_) => ErrorCode::ConfigParseError,
            Self::Lock(err) => err.code(),
            Self::Snapshot(err) => err.code(),
            Self::Store(err) => err.code(),
        }
    }
}

/// Walk up from `start` to the nearest directory holding `.tudu/`.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(WORKSPACE_DIR).is_dir() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    config: ProjectConfig,
}

impl Workspace {
    /// Open the workspace enclosing `start`.
    pub fn discover(start: &Path) -> Result<Self, WorkspaceError> {
        let root =
            find_root(start).ok_or_else(|| WorkspaceError::NotInitialized(start.to_path_buf()))?;
        Self::open(root)
    }

    /// Open a workspace rooted exactly at `root`.
    pub fn open(root: PathBuf) -> Result<Self, WorkspaceError> {
        if !root.join(WORKSPACE_DIR).is_dir() {
            return Err(WorkspaceError::NotInitialized(root));
        }
        let config = load_project_config(&root).map_err(WorkspaceError::Config)?;
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn config(&self) -> &ProjectConfig {
        &self.config
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn snapshot(&self) -> SnapshotStore {
        SnapshotStore::new(self.dir().join(SNAPSHOT_DIR))
    }

    /// Take the workspace lock, waiting up to `timeout`.
    pub fn lock(&self, timeout: Duration) -> Result<WorkspaceLock, LockError> {
        WorkspaceLock::acquire(&self.dir().join(LOCK_FILE), timeout)
    }

    /// HTTP client for the configured server, if any.
    pub fn remote(&self) -> Option<HttpRemote> {
        HttpRemote::from_config(&self.config.remote)
    }

    /// Snapshot contents, or an empty store before the first write.
    /// The caller must hold the lock.
    pub fn load(&self) -> Result<LocalStore, WorkspaceError> {
        Ok(self.snapshot().load()?.unwrap_or_default())
    }

    /// Read the store under the lock.
    pub fn read(&self) -> Result<LocalStore, WorkspaceError> {
        let _lock = self.lock(self.config.store.lock_timeout())?;
        self.load()
    }

    /// Locked load → mutate → save. Nothing is written when `mutate` fails.
    pub fn edit<T>(
        &self,
        mutate: impl FnOnce(&mut LocalStore) -> Result<T, StoreError>,
    ) -> Result<T, WorkspaceError> {
        let _lock = self.lock(self.config.store.lock_timeout())?;
        let mut store = self.load()?;
        let value = mutate(&mut store)?;
        self.snapshot().save(&store)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tudu_core::config::save_project_config;
    use tudu_core::model::{NewContainer, SyncState};

    fn init(dir: &Path) -> Workspace {
        let mut config = ProjectConfig::default();
        config.store.lock_timeout_ms = 0;
        save_project_config(dir, &config).unwrap();
        Workspace::open(dir.to_path_buf()).unwrap()
    }

    #[test]
    fn missing_workspace_is_not_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let err = Workspace::discover(dir.path()).unwrap_err();
        assert!(matches!(err, WorkspaceError::NotInitialized(_)));
        assert_eq!(err.code(), ErrorCode::NotInitialized);
    }

    #[test]
    fn discover_walks_up_to_the_root() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path());
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();

        let ws = Workspace::discover(&nested).unwrap();
        assert_eq!(ws.root(), dir.path());
    }

    #[test]
    fn edit_persists_between_opens() {
        let dir = tempfile::tempdir().unwrap();
        let ws = init(dir.path());
        let id = ws
            .edit(|store| {
                store.create_container(NewContainer {
                    title: "Groceries".into(),
                    position: None,
                })
            })
            .unwrap();

        let reopened = Workspace::open(dir.path().to_path_buf()).unwrap();
        let store = reopened.read().unwrap();
        assert_eq!(store.container(&id).unwrap().sync, SyncState::PendingCreate);
    }

    #[test]
    fn failed_edit_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ws = init(dir.path());
        let err = ws
            .edit(|store| {
                store.create_container(NewContainer {
                    title: "   ".into(),
                    position: None,
                })
            })
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidTitle);
        assert!(!ws.snapshot().exists());
    }

    #[test]
    fn held_lock_blocks_edits() {
        let dir = tempfile::tempdir().unwrap();
        let ws = init(dir.path());
        let _held = ws.lock(Duration::ZERO).unwrap();

        let err = ws.edit(|store| Ok(store.pending_count())).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LockContention);
    }

    #[test]
    fn bad_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(WORKSPACE_DIR)).unwrap();
        std::fs::write(
            dir.path().join(WORKSPACE_DIR).join("config.toml"),
            "[remote\n",
        )
        .unwrap();

        let err = Workspace::discover(dir.path()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParseError);
    }
}
