pub mod completions;
pub mod init;
pub mod item;
pub mod list;
pub mod reset;
pub mod resolve;
pub mod status;
pub mod sync;

use tudu_core::error::StoreError;
use tudu_core::model::{SyncFailure, SyncState};
use tudu_core::store::{EntityRef, LocalStore};

/// Resolve a list id or unique id prefix.
pub fn resolve_list_id(store: &LocalStore, raw: &str) -> Result<String, StoreError> {
    match store.find(raw)? {
        EntityRef::Container(list) => Ok(list.id.clone()),
        EntityRef::Member(_) => Err(StoreError::NotFound {
            id: raw.to_string(),
        }),
    }
}

/// Resolve an item id or unique id prefix.
pub fn resolve_item_id(store: &LocalStore, raw: &str) -> Result<String, StoreError> {
    match store.find(raw)? {
        EntityRef::Member(item) => Ok(item.id.clone()),
        EntityRef::Container(_) => Err(StoreError::NotFound {
            id: raw.to_string(),
        }),
    }
}

/// One-character sync marker for pretty output.
pub fn sync_marker(state: SyncState, failure: Option<&SyncFailure>) -> &'static str {
    if failure.is_some_and(|f| f.blocked) {
        return "!";
    }
    match state {
        SyncState::Clean => " ",
        SyncState::PendingCreate => "+",
        SyncState::PendingUpdate => "~",
        SyncState::PendingDelete | SyncState::Abandoned => "-",
    }
}
