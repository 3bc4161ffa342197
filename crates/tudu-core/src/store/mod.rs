//! Local mutation store.
//!
//! Holds the working copy of every list and item, each tagged with its
//! [`SyncState`]. User operations only ever touch this copy; the reconciler
//! is the one component that moves data between the store and the server.
//!
//! Entities are kept in insertion order, which is also the order in which a
//! reconciliation pass visits them.

pub mod snapshot;

use serde::Serialize;
use tracing::debug;

use crate::error::StoreError;
use crate::model::validate::{check_position, normalize_title};
use crate::model::{
    Container, ContainerPatch, EntityKind, Member, MemberPatch, NewContainer, NewMember,
    SyncFailure, SyncState, Tracked, placeholder_id,
};
use crate::sync::RemapTable;

/// Horizontal gap between consecutive lists in the default layout.
pub const CONTAINER_SPACING: f64 = 2.2;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What [`LocalStore::remove`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Removal {
    /// Never reached the server; dropped outright.
    Purged,
    /// Server-backed; a delete is queued for the next pass.
    MarkedDeleted,
}

/// How to settle a pending entity by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Clear the recorded failure so the next pass tries again.
    Retry,
    /// Drop the local change.
    Discard,
}

/// What [`LocalStore::resolve`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolved {
    /// Failure cleared; the pending action stays queued.
    Retrying,
    /// Entity removed from the store.
    Purged,
    /// Local edits dropped; the entity is clean again.
    Reverted,
}

/// Borrowed view of either entity family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityRef<'a> {
    Container(&'a Container),
    Member(&'a Member),
}

impl EntityRef<'_> {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Container(c) => &c.id,
            Self::Member(m) => &m.id,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Container(c) => &c.title,
            Self::Member(m) => &m.title,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        match self {
            Self::Container(_) => EntityKind::List,
            Self::Member(_) => EntityKind::Item,
        }
    }

    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        match self {
            Self::Container(c) => c.sync,
            Self::Member(m) => m.sync,
        }
    }

    #[must_use]
    pub fn sync_failure(&self) -> Option<&SyncFailure> {
        match self {
            Self::Container(c) => c.sync_failure.as_ref(),
            Self::Member(m) => m.sync_failure.as_ref(),
        }
    }
}

/// Pending entities broken down by queued action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingSummary {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    pub abandoned: usize,
    /// Subset of the above that is blocked on a permanent failure.
    pub blocked: usize,
}

impl PendingSummary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.creates + self.updates + self.deletes + self.abandoned
    }

    fn count<T: Tracked>(&mut self, entity: &T) {
        match entity.sync_state() {
            SyncState::Clean => return,
            SyncState::PendingCreate => self.creates += 1,
            SyncState::PendingUpdate => self.updates += 1,
            SyncState::PendingDelete => self.deletes += 1,
            SyncState::Abandoned => self.abandoned += 1,
        }
        if entity.is_blocked() {
            self.blocked += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// The client's working copy of lists and items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalStore {
    containers: Vec<Container>,
    members: Vec<Member>,
}

impl LocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from persisted or freshly fetched records, keeping their
    /// order.
    #[must_use]
    pub const fn from_records(containers: Vec<Container>, members: Vec<Member>) -> Self {
        Self {
            containers,
            members,
        }
    }

    #[must_use]
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.members.is_empty()
    }

    #[must_use]
    pub fn container(&self, id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Exact-id lookup across both families.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<EntityRef<'_>> {
        self.container(id)
            .map(EntityRef::Container)
            .or_else(|| self.member(id).map(EntityRef::Member))
    }

    /// Lists that are not on their way out, in insertion order.
    pub fn visible_containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.iter().filter(|c| c.sync.is_live())
    }

    /// Items of one list (or standalone todos for `None`), ordered by
    /// `sort_order`. Ties keep insertion order.
    #[must_use]
    pub fn visible_members(&self, container_id: Option<&str>) -> Vec<&Member> {
        let mut out: Vec<&Member> = self
            .members
            .iter()
            .filter(|m| m.sync.is_live() && m.container_id.as_deref() == container_id)
            .collect();
        out.sort_by_key(|m| m.sort_order);
        out
    }

    #[must_use]
    pub fn standalone_todos(&self) -> Vec<&Member> {
        self.visible_members(None)
    }

    /// Resolve a full id or a unique id prefix.
    ///
    /// An exact match always wins, even if it is also a prefix of another id.
    pub fn find(&self, prefix: &str) -> Result<EntityRef<'_>, StoreError> {
        if let Some(found) = self.get(prefix) {
            return Ok(found);
        }
        if prefix.is_empty() {
            return Err(StoreError::NotFound { id: String::new() });
        }

        let mut matches = self
            .containers
            .iter()
            .filter(|c| c.id.starts_with(prefix))
            .map(EntityRef::Container)
            .chain(
                self.members
                    .iter()
                    .filter(|m| m.id.starts_with(prefix))
                    .map(EntityRef::Member),
            );

        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(found),
            (None, _) => Err(StoreError::NotFound {
                id: prefix.to_string(),
            }),
            (Some(_), second) => Err(StoreError::Ambiguous {
                prefix: prefix.to_string(),
                count: 1 + usize::from(second.is_some()) + matches.count(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // User mutations
    // -----------------------------------------------------------------------

    /// Create a list locally. Returns its placeholder id.
    pub fn create_container(&mut self, draft: NewContainer) -> Result<String, StoreError> {
        let title = normalize_title(&draft.title)?;
        let (position_x, position_z) = match draft.position {
            Some((x, z)) => (check_position("x", x)?, check_position("z", z)?),
            None => {
                #[allow(clippy::cast_precision_loss)]
                let slot = self.visible_containers().count() as f64;
                (slot * CONTAINER_SPACING, 0.0)
            }
        };

        let id = placeholder_id();
        debug!(id = %id, title = %title, "queued list create");
        self.containers.push(Container {
            id: id.clone(),
            title,
            position_x,
            position_z,
            sync: SyncState::PendingCreate,
            sync_failure: None,
        });
        Ok(id)
    }

    /// Create an item (or a standalone todo when `container_id` is `None`)
    /// locally. Returns its placeholder id.
    pub fn create_member(&mut self, draft: NewMember) -> Result<String, StoreError> {
        let title = normalize_title(&draft.title)?;
        if let Some(container_id) = draft.container_id.as_deref() {
            let live = self
                .container(container_id)
                .is_some_and(|c| c.sync.is_live());
            if !live {
                return Err(StoreError::NotFound {
                    id: container_id.to_string(),
                });
            }
        }

        let sort_order = self.next_sort_order(draft.container_id.as_deref());
        let id = placeholder_id();
        debug!(id = %id, list = ?draft.container_id, sort_order, "queued item create");
        self.members.push(Member {
            id: id.clone(),
            container_id: draft.container_id,
            title,
            completed: false,
            sort_order,
            sync: SyncState::PendingCreate,
            sync_failure: None,
        });
        Ok(id)
    }

    /// Merge `patch` into a live list.
    pub fn update_container(&mut self, id: &str, patch: &ContainerPatch) -> Result<(), StoreError> {
        let title = patch.title.as_deref().map(normalize_title).transpose()?;
        let position_x = patch.position_x.map(|x| check_position("x", x)).transpose()?;
        let position_z = patch.position_z.map(|z| check_position("z", z)).transpose()?;

        let container = self
            .containers
            .iter_mut()
            .find(|c| c.id == id && c.sync.is_live())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        if patch.is_empty() {
            return Ok(());
        }

        if let Some(title) = title {
            container.title = title;
        }
        if let Some(x) = position_x {
            container.position_x = x;
        }
        if let Some(z) = position_z {
            container.position_z = z;
        }
        container.sync = container.sync.after_edit();
        debug!(id, state = %container.sync, "list edited");
        Ok(())
    }

    /// Merge `patch` into a live item.
    pub fn update_member(&mut self, id: &str, patch: &MemberPatch) -> Result<(), StoreError> {
        let title = patch.title.as_deref().map(normalize_title).transpose()?;

        let member = self
            .members
            .iter_mut()
            .find(|m| m.id == id && m.sync.is_live())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        if patch.is_empty() {
            return Ok(());
        }

        if let Some(title) = title {
            member.title = title;
        }
        if let Some(completed) = patch.completed {
            member.completed = completed;
        }
        if let Some(sort_order) = patch.sort_order {
            member.sort_order = sort_order;
        }
        member.sync = member.sync.after_edit();
        debug!(id, state = %member.sync, "item edited");
        Ok(())
    }

    /// Remove a live list or item.
    ///
    /// Entities the server has never seen are dropped at once, together with
    /// the unsynced items of an unsynced list. Server-backed ones are marked
    /// for deletion and their items are left alone.
    pub fn remove(&mut self, id: &str) -> Result<Removal, StoreError> {
        let state = self
            .get(id)
            .map(|e| e.sync_state())
            .filter(|s| s.is_live())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        if state == SyncState::PendingCreate {
            self.purge(id);
            let before = self.members.len();
            self.members.retain(|m| {
                m.container_id.as_deref() != Some(id) || !m.sync.is_local_only()
            });
            debug!(id, items = before - self.members.len(), "dropped unsynced entity");
            return Ok(Removal::Purged);
        }

        if let Some(c) = self.containers.iter_mut().find(|c| c.id == id) {
            c.sync = SyncState::PendingDelete;
        } else if let Some(m) = self.members.iter_mut().find(|m| m.id == id) {
            m.sync = SyncState::PendingDelete;
        }
        debug!(id, "queued delete");
        Ok(Removal::MarkedDeleted)
    }

    /// Settle a pending entity by hand, typically one blocked on a permanent
    /// server refusal.
    pub fn resolve(&mut self, id: &str, resolution: Resolution) -> Result<Resolved, StoreError> {
        let state = self
            .get(id)
            .map(|e| e.sync_state())
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;

        let outcome = match (resolution, state) {
            (Resolution::Retry, _) | (Resolution::Discard, SyncState::Clean) => {
                self.with_tracked(id, |failure, _| *failure = None);
                Resolved::Retrying
            }
            (
                Resolution::Discard,
                SyncState::PendingCreate | SyncState::PendingDelete | SyncState::Abandoned,
            ) => {
                self.purge(id);
                Resolved::Purged
            }
            (Resolution::Discard, SyncState::PendingUpdate) => {
                self.with_tracked(id, |failure, sync| {
                    *failure = None;
                    *sync = SyncState::Clean;
                });
                Resolved::Reverted
            }
        };
        debug!(id, ?outcome, "resolved");
        Ok(outcome)
    }

    /// Number of entities not in the `Clean` state.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.containers.iter().filter(|c| c.is_pending()).count()
            + self.members.iter().filter(|m| m.is_pending()).count()
    }

    #[must_use]
    pub fn pending_summary(&self) -> PendingSummary {
        let mut summary = PendingSummary::default();
        for c in &self.containers {
            summary.count(c);
        }
        for m in &self.members {
            summary.count(m);
        }
        summary
    }

    /// Entities skipped by reconciliation until resolved.
    pub fn blocked(&self) -> impl Iterator<Item = EntityRef<'_>> {
        self.containers
            .iter()
            .filter(|c| c.is_blocked())
            .map(EntityRef::Container)
            .chain(
                self.members
                    .iter()
                    .filter(|m| m.is_blocked())
                    .map(EntityRef::Member),
            )
    }

    // -----------------------------------------------------------------------
    // Reconciler-facing mutators
    // -----------------------------------------------------------------------

    pub(crate) fn container_mut(&mut self, id: &str) -> Option<&mut Container> {
        self.containers.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn member_mut(&mut self, id: &str) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    /// Swap the local record for the server-confirmed one, in place.
    pub(crate) fn replace_container(&mut self, id: &str, mut record: Container) -> bool {
        record.sync = SyncState::Clean;
        record.sync_failure = None;
        match self.container_mut(id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Swap the local record for the server-confirmed one, in place.
    pub(crate) fn replace_member(&mut self, id: &str, mut record: Member) -> bool {
        record.sync = SyncState::Clean;
        record.sync_failure = None;
        match self.member_mut(id) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    /// Drop an entity of either family. Returns whether anything was removed.
    pub(crate) fn purge(&mut self, id: &str) -> bool {
        let before = self.containers.len() + self.members.len();
        self.containers.retain(|c| c.id != id);
        self.members.retain(|m| m.id != id);
        before != self.containers.len() + self.members.len()
    }

    /// Drop every item that belongs to `container_id`.
    pub(crate) fn purge_members_of(&mut self, container_id: &str) -> usize {
        let before = self.members.len();
        self.members
            .retain(|m| m.container_id.as_deref() != Some(container_id));
        before - self.members.len()
    }

    /// Drop the items of `container_id` that are queued for deletion.
    pub(crate) fn purge_deleted_members_of(&mut self, container_id: &str) -> usize {
        let before = self.members.len();
        self.members.retain(|m| {
            m.container_id.as_deref() != Some(container_id) || m.sync != SyncState::PendingDelete
        });
        before - self.members.len()
    }

    /// Count a failed attempt. Permanent failures block the entity once
    /// `max_attempts` is reached.
    pub(crate) fn record_failure(
        &mut self,
        id: &str,
        reason: String,
        permanent: bool,
        max_attempts: u32,
    ) -> Option<SyncFailure> {
        let mut recorded = None;
        self.with_tracked(id, |failure, _| {
            let attempts = failure.as_ref().map_or(0, |f| f.attempts) + 1;
            let next = SyncFailure {
                attempts,
                reason,
                blocked: permanent && attempts >= max_attempts.max(1),
            };
            recorded = Some(next.clone());
            *failure = Some(next);
        });
        recorded
    }

    /// Rewrite container references through `table`. Returns how many items
    /// changed.
    pub(crate) fn apply_remap(&mut self, table: &RemapTable) -> usize {
        table
            .iter()
            .map(|(from, to)| self.rewrite_container_refs(from, to))
            .sum()
    }

    /// Point every item of `from` at `to`.
    pub(crate) fn rewrite_container_refs(&mut self, from: &str, to: &str) -> usize {
        let mut rewritten = 0;
        for member in &mut self.members {
            if member.container_id.as_deref() == Some(from) {
                member.container_id = Some(to.to_string());
                rewritten += 1;
            }
        }
        rewritten
    }

    fn with_tracked(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Option<SyncFailure>, &mut SyncState),
    ) {
        if let Some(c) = self.container_mut(id) {
            f(&mut c.sync_failure, &mut c.sync);
        } else if let Some(m) = self.member_mut(id) {
            f(&mut m.sync_failure, &mut m.sync);
        }
    }

    fn next_sort_order(&self, container_id: Option<&str>) -> i64 {
        self.members
            .iter()
            .filter(|m| m.container_id.as_deref() == container_id)
            .map(|m| m.sort_order)
            .max()
            .unwrap_or(0)
            + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_list(id: &str, title: &str) -> Container {
        Container {
            id: id.into(),
            title: title.into(),
            position_x: 0.0,
            position_z: 0.0,
            sync: SyncState::Clean,
            sync_failure: None,
        }
    }

    fn clean_item(id: &str, list: Option<&str>, sort_order: i64) -> Member {
        Member {
            id: id.into(),
            container_id: list.map(str::to_string),
            title: format!("item {id}"),
            completed: false,
            sort_order,
            sync: SyncState::Clean,
            sync_failure: None,
        }
    }

    fn new_list(store: &mut LocalStore, title: &str) -> String {
        store
            .create_container(NewContainer {
                title: title.into(),
                position: None,
            })
            .unwrap()
    }

    fn new_item(store: &mut LocalStore, list: Option<&str>, title: &str) -> String {
        store
            .create_member(NewMember {
                container_id: list.map(str::to_string),
                title: title.into(),
            })
            .unwrap()
    }

    #[test]
    fn create_container_assigns_placeholder_and_slot() {
        let mut store = LocalStore::new();
        let first = new_list(&mut store, "Groceries");
        let second = new_list(&mut store, "Chores");

        assert!(crate::model::is_placeholder(&first));
        let a = store.container(&first).unwrap();
        let b = store.container(&second).unwrap();
        assert_eq!(a.sync, SyncState::PendingCreate);
        assert_eq!(a.position_x, 0.0);
        assert!((b.position_x - CONTAINER_SPACING).abs() < f64::EPSILON);
        assert_eq!(b.position_z, 0.0);
    }

    #[test]
    fn explicit_position_must_be_finite() {
        let mut store = LocalStore::new();
        let err = store
            .create_container(NewContainer {
                title: "Bad".into(),
                position: Some((f64::NAN, 0.0)),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn blank_title_is_rejected_before_anything_is_stored() {
        let mut store = LocalStore::new();
        let err = store
            .create_container(NewContainer {
                title: "   ".into(),
                position: None,
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn sort_order_is_max_plus_one_per_container() {
        let mut store = LocalStore::from_records(
            vec![clean_list("srv-1", "Groceries")],
            vec![clean_item("srv-2", Some("srv-1"), 4)],
        );
        let milk = new_item(&mut store, Some("srv-1"), "Milk");
        let todo = new_item(&mut store, None, "Call mom");

        assert_eq!(store.member(&milk).unwrap().sort_order, 5);
        assert_eq!(store.member(&todo).unwrap().sort_order, 1);
    }

    #[test]
    fn sort_order_counts_members_pending_deletion() {
        let mut store = LocalStore::from_records(
            vec![clean_list("srv-1", "Groceries")],
            vec![clean_item("srv-2", Some("srv-1"), 7)],
        );
        assert_eq!(store.remove("srv-2").unwrap(), Removal::MarkedDeleted);
        let eggs = new_item(&mut store, Some("srv-1"), "Eggs");
        assert_eq!(store.member(&eggs).unwrap().sort_order, 8);
    }

    #[test]
    fn member_under_unknown_or_deleted_container_is_not_found() {
        let mut store = LocalStore::from_records(vec![clean_list("srv-1", "Old")], vec![]);
        store.remove("srv-1").unwrap();

        for list in ["srv-1", "srv-404"] {
            let err = store
                .create_member(NewMember {
                    container_id: Some(list.into()),
                    title: "Milk".into(),
                })
                .unwrap_err();
            assert_eq!(err, StoreError::NotFound { id: list.into() });
        }
    }

    #[test]
    fn edit_dirties_clean_but_keeps_pending_create() {
        let mut store = LocalStore::from_records(vec![clean_list("srv-1", "Groceries")], vec![]);
        let local = new_list(&mut store, "Chores");

        let patch = ContainerPatch {
            title: Some("Renamed".into()),
            ..ContainerPatch::default()
        };
        store.update_container("srv-1", &patch).unwrap();
        store.update_container(&local, &patch).unwrap();

        assert_eq!(store.container("srv-1").unwrap().sync, SyncState::PendingUpdate);
        assert_eq!(store.container(&local).unwrap().sync, SyncState::PendingCreate);
        assert_eq!(store.container("srv-1").unwrap().title, "Renamed");
    }

    #[test]
    fn empty_patch_leaves_state_alone() {
        let mut store = LocalStore::from_records(vec![], vec![clean_item("srv-2", None, 1)]);
        store.update_member("srv-2", &MemberPatch::default()).unwrap();
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn update_of_deleted_entity_is_not_found() {
        let mut store = LocalStore::from_records(vec![], vec![clean_item("srv-2", None, 1)]);
        store.remove("srv-2").unwrap();
        let err = store
            .update_member(
                "srv-2",
                &MemberPatch {
                    completed: Some(true),
                    ..MemberPatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn remove_purges_local_only_and_marks_server_backed() {
        let mut store = LocalStore::from_records(vec![clean_list("srv-9", "Old")], vec![]);
        let local = new_list(&mut store, "Draft");

        assert_eq!(store.remove(&local).unwrap(), Removal::Purged);
        assert!(store.container(&local).is_none());

        assert_eq!(store.remove("srv-9").unwrap(), Removal::MarkedDeleted);
        assert_eq!(store.container("srv-9").unwrap().sync, SyncState::PendingDelete);
        assert_eq!(store.visible_containers().count(), 0);

        assert!(matches!(
            store.remove("srv-9"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn removing_an_unsynced_list_drops_its_unsynced_items() {
        let mut store = LocalStore::new();
        let draft = new_list(&mut store, "Draft");
        let kept = new_list(&mut store, "Kept");
        new_item(&mut store, Some(&draft), "Orphan");
        new_item(&mut store, Some(&draft), "Another");
        let other = new_item(&mut store, Some(&kept), "Milk");
        let todo = new_item(&mut store, None, "Call mom");

        assert_eq!(store.remove(&draft).unwrap(), Removal::Purged);

        let ids: Vec<&str> = store.members().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, [other.as_str(), todo.as_str()]);
        assert_eq!(store.pending_count(), 3);
    }

    #[test]
    fn deleted_members_of_a_list_are_purged_alone() {
        let mut store = LocalStore::from_records(
            vec![clean_list("srv-1", "Groceries")],
            vec![
                clean_item("srv-2", Some("srv-1"), 1),
                clean_item("srv-3", Some("srv-1"), 2),
                clean_item("srv-4", None, 1),
            ],
        );
        store.remove("srv-2").unwrap();
        store.remove("srv-4").unwrap();

        assert_eq!(store.purge_deleted_members_of("srv-1"), 1);
        assert!(store.member("srv-2").is_none());
        assert!(store.member("srv-3").is_some());
        assert_eq!(store.member("srv-4").unwrap().sync, SyncState::PendingDelete);
    }

    #[test]
    fn pending_count_follows_state() {
        let mut store = LocalStore::from_records(
            vec![clean_list("srv-1", "Groceries")],
            vec![clean_item("srv-2", Some("srv-1"), 1)],
        );
        assert_eq!(store.pending_count(), 0);

        store
            .update_member(
                "srv-2",
                &MemberPatch {
                    completed: Some(true),
                    ..MemberPatch::default()
                },
            )
            .unwrap();
        assert_eq!(store.pending_count(), 1);

        let summary = store.pending_summary();
        assert_eq!(summary.updates, 1);
        assert_eq!(summary.total(), 1);
    }

    #[test]
    fn visible_members_are_sorted() {
        let store = LocalStore::from_records(
            vec![clean_list("srv-1", "Groceries")],
            vec![
                clean_item("b", Some("srv-1"), 3),
                clean_item("a", Some("srv-1"), 1),
                clean_item("t", None, 1),
            ],
        );
        let ids: Vec<&str> = store
            .visible_members(Some("srv-1"))
            .iter()
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(store.standalone_todos().len(), 1);
    }

    #[test]
    fn prefix_lookup() {
        let store = LocalStore::from_records(
            vec![clean_list("srv-10", "A"), clean_list("srv-11", "B")],
            vec![clean_item("item-1", None, 1)],
        );

        assert_eq!(store.find("item").unwrap().id(), "item-1");
        assert_eq!(store.find("srv-10").unwrap().kind(), EntityKind::List);
        assert_eq!(
            store.find("srv-1").unwrap_err(),
            StoreError::Ambiguous {
                prefix: "srv-1".into(),
                count: 2
            }
        );
        assert!(matches!(
            store.find("nope"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn exact_id_beats_longer_prefix_match() {
        let store = LocalStore::from_records(
            vec![clean_list("srv-1", "A"), clean_list("srv-12", "B")],
            vec![],
        );
        assert_eq!(store.find("srv-1").unwrap().title(), "A");
    }

    #[test]
    fn failures_block_only_when_permanent() {
        let mut store = LocalStore::from_records(vec![clean_list("srv-1", "A")], vec![]);

        let first = store
            .record_failure("srv-1", "network".into(), false, 1)
            .unwrap();
        assert_eq!(first.attempts, 1);
        assert!(!first.blocked);

        let second = store
            .record_failure("srv-1", "forbidden".into(), true, 2)
            .unwrap();
        assert_eq!(second.attempts, 2);
        assert!(second.blocked);
        assert_eq!(store.blocked().count(), 1);
        assert!(store.record_failure("missing", "x".into(), true, 1).is_none());
    }

    #[test]
    fn resolve_retry_clears_block_and_keeps_action() {
        let mut store = LocalStore::from_records(vec![clean_list("srv-1", "A")], vec![]);
        store.remove("srv-1").unwrap();
        store.record_failure("srv-1", "forbidden".into(), true, 1);

        assert_eq!(
            store.resolve("srv-1", Resolution::Retry).unwrap(),
            Resolved::Retrying
        );
        let list = store.container("srv-1").unwrap();
        assert_eq!(list.sync, SyncState::PendingDelete);
        assert!(list.sync_failure.is_none());
    }

    #[test]
    fn resolve_discard_by_state() {
        let mut store = LocalStore::from_records(
            vec![clean_list("srv-1", "A"), clean_list("srv-2", "B")],
            vec![],
        );
        let local = new_list(&mut store, "C");
        store
            .update_container(
                "srv-1",
                &ContainerPatch {
                    title: Some("A2".into()),
                    ..ContainerPatch::default()
                },
            )
            .unwrap();
        store.remove("srv-2").unwrap();

        assert_eq!(
            store.resolve("srv-1", Resolution::Discard).unwrap(),
            Resolved::Reverted
        );
        assert_eq!(store.container("srv-1").unwrap().sync, SyncState::Clean);
        assert_eq!(
            store.resolve("srv-2", Resolution::Discard).unwrap(),
            Resolved::Purged
        );
        assert_eq!(
            store.resolve(&local, Resolution::Discard).unwrap(),
            Resolved::Purged
        );
        assert_eq!(store.containers().len(), 1);
        assert_eq!(store.pending_count(), 0);
    }

    #[test]
    fn remap_rewrites_only_matching_members() {
        let mut store = LocalStore::from_records(
            vec![],
            vec![
                clean_item("a", Some("local-1"), 1),
                clean_item("b", Some("srv-5"), 1),
                clean_item("c", None, 1),
            ],
        );
        let mut table = RemapTable::new();
        table.insert("local-1", "srv-9");

        assert_eq!(store.apply_remap(&table), 1);
        assert_eq!(store.member("a").unwrap().container_id.as_deref(), Some("srv-9"));
        assert_eq!(store.member("b").unwrap().container_id.as_deref(), Some("srv-5"));
        assert_eq!(store.member("c").unwrap().container_id, None);
    }

    #[test]
    fn replace_keeps_insertion_position() {
        let mut store = LocalStore::from_records(
            vec![clean_list("local-x", "A"), clean_list("srv-3", "B")],
            vec![],
        );
        assert!(store.replace_container("local-x", clean_list("srv-4", "A")));
        let ids: Vec<&str> = store.containers().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["srv-4", "srv-3"]);
    }
}
