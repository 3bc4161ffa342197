use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an entity stands relative to the server's authoritative copy.
///
/// Persisted as the `localOnly` / `dirty` / `deleted` flag triple so that
/// snapshots and server records share one JSON shape; server records carry no
/// flags and therefore load as [`SyncState::Clean`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "SyncFlags", into = "SyncFlags")]
pub enum SyncState {
    /// Matches the last server-confirmed copy.
    #[default]
    Clean,
    /// Never sent to the server; carries a placeholder id.
    PendingCreate,
    /// Server-backed with local edits.
    PendingUpdate,
    /// Server-backed, removal requested.
    PendingDelete,
    /// Created and deleted locally before the server ever saw it.
    Abandoned,
}

impl SyncState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::PendingCreate => "pending-create",
            Self::PendingUpdate => "pending-update",
            Self::PendingDelete => "pending-delete",
            Self::Abandoned => "abandoned",
        }
    }

    /// Derive the state from the flag triple.
    #[must_use]
    pub const fn from_flags(local_only: bool, dirty: bool, deleted: bool) -> Self {
        match (local_only, dirty, deleted) {
            (true, _, true) => Self::Abandoned,
            (true, _, false) => Self::PendingCreate,
            (false, _, true) => Self::PendingDelete,
            (false, true, false) => Self::PendingUpdate,
            (false, false, false) => Self::Clean,
        }
    }

    #[must_use]
    pub const fn flags(self) -> SyncFlags {
        let (local_only, dirty, deleted) = match self {
            Self::Clean => (false, false, false),
            Self::PendingCreate => (true, true, false),
            Self::PendingUpdate => (false, true, false),
            Self::PendingDelete => (false, true, true),
            Self::Abandoned => (true, true, true),
        };
        SyncFlags {
            local_only,
            dirty,
            deleted,
        }
    }

    /// Anything other than `Clean` still needs a reconciliation step.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        !matches!(self, Self::Clean)
    }

    /// The server has never confirmed this entity.
    #[must_use]
    pub const fn is_local_only(self) -> bool {
        matches!(self, Self::PendingCreate | Self::Abandoned)
    }

    /// Still shown to the user (not on its way out).
    #[must_use]
    pub const fn is_live(self) -> bool {
        !matches!(self, Self::PendingDelete | Self::Abandoned)
    }

    /// State after a local edit: clean records become dirty, everything else
    /// keeps its pending action.
    #[must_use]
    pub const fn after_edit(self) -> Self {
        match self {
            Self::Clean => Self::PendingUpdate,
            other => other,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serialized shape of [`SyncState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncFlags {
    pub local_only: bool,
    pub dirty: bool,
    pub deleted: bool,
}

impl From<SyncFlags> for SyncState {
    fn from(flags: SyncFlags) -> Self {
        Self::from_flags(flags.local_only, flags.dirty, flags.deleted)
    }
}

impl From<SyncState> for SyncFlags {
    fn from(state: SyncState) -> Self {
        state.flags()
    }
}

/// Last failed reconciliation attempt for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub attempts: u32,
    pub reason: String,
    /// Permanent failure; later passes skip the entity until it is resolved.
    #[serde(default)]
    pub blocked: bool,
}

/// The two entity families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    List,
    Item,
}

impl EntityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Item => "item",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle bookkeeping shared by containers and members.
pub trait Tracked {
    const KIND: EntityKind;

    fn sync_state(&self) -> SyncState;
    fn sync_failure(&self) -> Option<&SyncFailure>;

    fn is_pending(&self) -> bool {
        self.sync_state().is_pending()
    }

    fn is_blocked(&self) -> bool {
        self.sync_failure().is_some_and(|failure| failure.blocked)
    }
}

/// A named grouping of members (a "list").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub title: String,
    #[serde(rename = "posX", default)]
    pub position_x: f64,
    #[serde(rename = "posZ", default)]
    pub position_z: f64,
    #[serde(flatten)]
    pub sync: SyncState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_failure: Option<SyncFailure>,
}

impl Container {
    /// Fields sent on update.
    #[must_use]
    pub fn fields(&self) -> ContainerFields {
        ContainerFields {
            title: self.title.clone(),
            position_x: self.position_x,
            position_z: self.position_z,
        }
    }
}

impl Tracked for Container {
    const KIND: EntityKind = EntityKind::List;

    fn sync_state(&self) -> SyncState {
        self.sync
    }

    fn sync_failure(&self) -> Option<&SyncFailure> {
        self.sync_failure.as_ref()
    }
}

/// An item in a list, or a standalone todo when `container_id` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    #[serde(rename = "listId", default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub sort_order: i64,
    #[serde(flatten)]
    pub sync: SyncState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_failure: Option<SyncFailure>,
}

impl Member {
    /// Fields sent on update.
    #[must_use]
    pub fn fields(&self) -> MemberFields {
        MemberFields {
            title: self.title.clone(),
            completed: self.completed,
            sort_order: self.sort_order,
        }
    }

    /// Borrowed routing information for remote calls.
    #[must_use]
    pub fn target(&self) -> MemberRef<'_> {
        MemberRef {
            id: &self.id,
            container_id: self.container_id.as_deref(),
        }
    }

    #[must_use]
    pub const fn is_standalone(&self) -> bool {
        self.container_id.is_none()
    }
}

impl Tracked for Member {
    const KIND: EntityKind = EntityKind::Item;

    fn sync_state(&self) -> SyncState {
        self.sync
    }

    fn sync_failure(&self) -> Option<&SyncFailure> {
        self.sync_failure.as_ref()
    }
}

/// Identifies a member on the server. Standalone todos and list items live
/// behind different routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberRef<'a> {
    pub id: &'a str,
    pub container_id: Option<&'a str>,
}

/// Update payload for a container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerFields {
    pub title: String,
    #[serde(rename = "posX")]
    pub position_x: f64,
    #[serde(rename = "posZ")]
    pub position_z: f64,
}

/// Update payload for a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberFields {
    pub title: String,
    pub completed: bool,
    pub sort_order: i64,
}

/// Input for creating a container locally.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewContainer {
    pub title: String,
    /// `(x, z)`; defaults to the next free slot in the row.
    pub position: Option<(f64, f64)>,
}

/// Input for creating a member locally.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewMember {
    pub container_id: Option<String>,
    pub title: String,
}

/// Partial update of a container. `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContainerPatch {
    pub title: Option<String>,
    pub position_x: Option<f64>,
    pub position_z: Option<f64>,
}

impl ContainerPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.position_x.is_none() && self.position_z.is_none()
    }
}

/// Partial update of a member. `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub sort_order: Option<i64>,
}

impl MemberPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none() && self.sort_order.is_none()
    }
}
