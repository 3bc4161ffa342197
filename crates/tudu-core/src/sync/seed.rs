//! Building the initial store.
//!
//! A snapshot on disk always wins. Only when there is none is the server
//! asked for its lists, their items, and the standalone todos.

use serde::Serialize;
use tracing::{info, warn};

use super::remote::{Remote, RemoteError};
use crate::model::SyncState;
use crate::store::LocalStore;
use crate::store::snapshot::{SnapshotError, SnapshotStore};

/// Where a loaded store came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum Origin {
    Snapshot,
    Seeded { lists: usize, items: usize },
    /// No snapshot and no reachable server.
    Empty,
}

/// Fetch everything the signed-in user owns. Every record comes back clean.
pub fn seed<R: Remote>(remote: &mut R) -> Result<LocalStore, RemoteError> {
    let mut containers = remote.list_containers()?;
    let mut members = Vec::new();
    for container in &containers {
        members.extend(remote.list_members(Some(&container.id))?);
    }
    members.extend(remote.list_members(None)?);

    for c in &mut containers {
        c.sync = SyncState::Clean;
        c.sync_failure = None;
    }
    for m in &mut members {
        m.sync = SyncState::Clean;
        m.sync_failure = None;
    }
    Ok(LocalStore::from_records(containers, members))
}

/// Load the snapshot, or seed from `remote` when there is none.
///
/// A seed failure is logged and yields an empty store so the client can
/// start offline.
pub fn load_or_seed<R: Remote>(
    snapshot: &SnapshotStore,
    remote: Option<&mut R>,
) -> Result<(LocalStore, Origin), SnapshotError> {
    if let Some(store) = snapshot.load()? {
        return Ok((store, Origin::Snapshot));
    }

    let Some(remote) = remote else {
        return Ok((LocalStore::new(), Origin::Empty));
    };

    match seed(remote) {
        Ok(store) => {
            let origin = Origin::Seeded {
                lists: store.containers().len(),
                items: store.members().len(),
            };
            info!(?origin, "seeded store from server");
            Ok((store, origin))
        }
        Err(err) => {
            warn!(error = %err, "seed failed, starting with an empty store");
            Ok((LocalStore::new(), Origin::Empty))
        }
    }
}
