//! In-process server double.
//!
//! Behaves like the REST API (server-assigned ids, list positions and item
//! sort orders, ownership checks) and records every call so tests can assert
//! on exactly what a pass sent. Failures can be injected per call kind.
//!
//! Like the real routes, a delete of a record that does not exist answers
//! `Forbidden`, not `NotFound`. Deleting a list drops its items.

use std::collections::HashSet;

use super::remote::{Remote, RemoteError};
use crate::model::{Container, ContainerFields, Member, MemberFields, MemberRef, SyncState};

/// Spacing the server uses when it places a new list.
const SERVER_LIST_SPACING: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    CreateContainer,
    UpdateContainer,
    DeleteContainer,
    CreateMember,
    UpdateMember,
    DeleteMember,
    ListContainers,
    ListMembers,
}

/// One recorded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateContainer {
        title: String,
    },
    UpdateContainer {
        id: String,
    },
    DeleteContainer {
        id: String,
    },
    CreateMember {
        container_id: Option<String>,
        title: String,
    },
    UpdateMember {
        id: String,
        container_id: Option<String>,
    },
    DeleteMember {
        id: String,
        container_id: Option<String>,
    },
    ListContainers,
    ListMembers {
        container_id: Option<String>,
    },
}

impl Call {
    #[must_use]
    pub const fn kind(&self) -> CallKind {
        match self {
            Self::CreateContainer { .. } => CallKind::CreateContainer,
            Self::UpdateContainer { .. } => CallKind::UpdateContainer,
            Self::DeleteContainer { .. } => CallKind::DeleteContainer,
            Self::CreateMember { .. } => CallKind::CreateMember,
            Self::UpdateMember { .. } => CallKind::UpdateMember,
            Self::DeleteMember { .. } => CallKind::DeleteMember,
            Self::ListContainers => CallKind::ListContainers,
            Self::ListMembers { .. } => CallKind::ListMembers,
        }
    }
}

/// Server state plus instrumentation.
#[derive(Debug)]
pub struct InMemoryRemote {
    next_id: u64,
    containers: Vec<Container>,
    members: Vec<Member>,
    foreign: HashSet<String>,
    authenticated: bool,
    calls: Vec<Call>,
    fail_once: Vec<(CallKind, RemoteError)>,
    fail_always: Vec<(CallKind, RemoteError)>,
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemote {
    /// Empty server with a signed-in session. Ids are issued as `srv-1`,
    /// `srv-2`, ... across both families.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            containers: Vec::new(),
            members: Vec::new(),
            foreign: HashSet::new(),
            authenticated: true,
            calls: Vec::new(),
            fail_once: Vec::new(),
            fail_always: Vec::new(),
        }
    }

    /// Continue issuing ids from `next` (e.g. `srv-9` after `with_next_id(9)`).
    #[must_use]
    pub const fn with_next_id(mut self, next: u64) -> Self {
        self.next_id = next;
        self
    }

    // --- setup ---------------------------------------------------------------

    /// Preload a list as if created earlier by this user.
    pub fn insert_container(&mut self, id: &str, title: &str) {
        self.reserve(id);
        self.containers.push(Container {
            id: id.to_string(),
            title: title.to_string(),
            position_x: 0.0,
            position_z: 0.0,
            sync: SyncState::Clean,
            sync_failure: None,
        });
    }

    /// Preload an item (or standalone todo).
    pub fn insert_member(&mut self, id: &str, container_id: Option<&str>, title: &str) {
        self.reserve(id);
        let sort_order = self.next_sort_order(container_id);
        self.members.push(Member {
            id: id.to_string(),
            container_id: container_id.map(str::to_string),
            title: title.to_string(),
            completed: false,
            sort_order,
            sync: SyncState::Clean,
            sync_failure: None,
        });
    }

    /// Treat `id` as owned by another user: updates and deletes are refused.
    pub fn mark_foreign(&mut self, id: &str) {
        self.foreign.insert(id.to_string());
    }

    pub const fn set_authenticated(&mut self, authenticated: bool) {
        self.authenticated = authenticated;
    }

    /// Fail the next call of `kind` with `err`, then behave normally.
    pub fn fail_next(&mut self, kind: CallKind, err: RemoteError) {
        self.fail_once.push((kind, err));
    }

    /// Fail every call of `kind` with `err` until cleared.
    pub fn fail_always(&mut self, kind: CallKind, err: RemoteError) {
        self.fail_always.push((kind, err));
    }

    pub fn clear_failures(&mut self) {
        self.fail_once.clear();
        self.fail_always.clear();
    }

    // --- inspection ----------------------------------------------------------

    #[must_use]
    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    #[must_use]
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    #[must_use]
    pub fn container(&self, id: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn calls(&self) -> &[Call] {
        &self.calls
    }

    #[must_use]
    pub fn count(&self, kind: CallKind) -> usize {
        self.calls.iter().filter(|c| c.kind() == kind).count()
    }

    /// Calls that change server state.
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| !matches!(c.kind(), CallKind::ListContainers | CallKind::ListMembers))
            .count()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    // --- internals -----------------------------------------------------------

    fn begin(&mut self, call: Call) -> Result<(), RemoteError> {
        let kind = call.kind();
        self.calls.push(call);

        if let Some(pos) = self.fail_once.iter().position(|(k, _)| *k == kind) {
            let (_, err) = self.fail_once.remove(pos);
            return Err(err);
        }
        if let Some((_, err)) = self.fail_always.iter().find(|(k, _)| *k == kind) {
            return Err(err.clone());
        }
        if !self.authenticated {
            return Err(RemoteError::Unauthorized);
        }
        Ok(())
    }

    /// Keep issued ids clear of preloaded `srv-N` ids.
    fn reserve(&mut self, id: &str) {
        if let Some(n) = id.strip_prefix("srv-").and_then(|n| n.parse::<u64>().ok()) {
            self.next_id = self.next_id.max(n + 1);
        }
    }

    fn issue_id(&mut self) -> String {
        let id = format!("srv-{}", self.next_id);
        self.next_id += 1;
        id
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

    fn owned(&self, id: &str) -> Result<(), RemoteError> {
        if self.foreign.contains(id) {
            Err(RemoteError::Forbidden)
        } else {
            Ok(())
        }
    }
}

impl Remote for InMemoryRemote {
    fn create_container(&mut self, title: &str) -> Result<Container, RemoteError> {
        self.begin(Call::CreateContainer {
            title: title.to_string(),
        })?;
        #[allow(clippy::cast_precision_loss)]
        let slot = self.containers.len() as f64;
        let record = Container {
            id: self.issue_id(),
            title: title.trim().to_string(),
            position_x: slot * SERVER_LIST_SPACING,
            position_z: 0.0,
            sync: SyncState::Clean,
            sync_failure: None,
        };
        self.containers.push(record.clone());
        Ok(record)
    }

    fn update_container(
        &mut self,
        id: &str,
        fields: &ContainerFields,
    ) -> Result<Container, RemoteError> {
        self.begin(Call::UpdateContainer { id: id.to_string() })?;
        self.owned(id)?;
        let record = self
            .containers
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RemoteError::NotFound)?;
        record.title.clone_from(&fields.title);
        record.position_x = fields.position_x;
        record.position_z = fields.position_z;
        Ok(record.clone())
    }

    fn delete_container(&mut self, id: &str) -> Result<(), RemoteError> {
        self.begin(Call::DeleteContainer { id: id.to_string() })?;
        self.owned(id)?;
        let before = self.containers.len();
        self.containers.retain(|c| c.id != id);
        if before == self.containers.len() {
            return Err(RemoteError::Forbidden);
        }
        self.members
            .retain(|m| m.container_id.as_deref() != Some(id));
        Ok(())
    }

    fn create_member(
        &mut self,
        container_id: Option<&str>,
        title: &str,
    ) -> Result<Member, RemoteError> {
        self.begin(Call::CreateMember {
            container_id: container_id.map(str::to_string),
            title: title.to_string(),
        })?;
        if let Some(list) = container_id {
            if self.foreign.contains(list) || self.container(list).is_none() {
                return Err(RemoteError::Forbidden);
            }
        }
        let record = Member {
            id: self.issue_id(),
            container_id: container_id.map(str::to_string),
            title: title.trim().to_string(),
            completed: false,
            sort_order: self.next_sort_order(container_id),
            sync: SyncState::Clean,
            sync_failure: None,
        };
        self.members.push(record.clone());
        Ok(record)
    }

    fn update_member(
        &mut self,
        target: MemberRef<'_>,
        fields: &MemberFields,
    ) -> Result<Member, RemoteError> {
        self.begin(Call::UpdateMember {
            id: target.id.to_string(),
            container_id: target.container_id.map(str::to_string),
        })?;
        self.owned(target.id)?;
        let record = self
            .members
            .iter_mut()
            .find(|m| m.id == target.id)
            .ok_or(RemoteError::NotFound)?;
        record.title.clone_from(&fields.title);
        record.completed = fields.completed;
        record.sort_order = fields.sort_order;
        Ok(record.clone())
    }

    fn delete_member(&mut self, target: MemberRef<'_>) -> Result<(), RemoteError> {
        self.begin(Call::DeleteMember {
            id: target.id.to_string(),
            container_id: target.container_id.map(str::to_string),
        })?;
        self.owned(target.id)?;
        let before = self.members.len();
        self.members.retain(|m| m.id != target.id);
        if before == self.members.len() {
            return Err(RemoteError::Forbidden);
        }
        Ok(())
    }

    fn list_containers(&mut self) -> Result<Vec<Container>, RemoteError> {
        self.begin(Call::ListContainers)?;
        Ok(self
            .containers
            .iter()
            .filter(|c| !self.foreign.contains(&c.id))
            .cloned()
            .collect())
    }

    fn list_members(&mut self, container_id: Option<&str>) -> Result<Vec<Member>, RemoteError> {
        self.begin(Call::ListMembers {
            container_id: container_id.map(str::to_string),
        })?;
        let mut out: Vec<Member> = self
            .members
            .iter()
            .filter(|m| m.container_id.as_deref() == container_id)
            .cloned()
            .collect();
        out.sort_by_key(|m| m.sort_order);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_across_families() {
        let mut remote = InMemoryRemote::new();
        let list = remote.create_container("Groceries").unwrap();
        let item = remote.create_member(Some(&list.id), "Milk").unwrap();
        assert_eq!(list.id, "srv-1");
        assert_eq!(item.id, "srv-2");
        assert_eq!(item.sort_order, 1);
        assert_eq!(remote.count(CallKind::CreateMember), 1);
    }

    #[test]
    fn lists_are_placed_in_a_row() {
        let mut remote = InMemoryRemote::new();
        remote.create_container("A").unwrap();
        let second = remote.create_container("B").unwrap();
        assert_eq!(second.position_x, 2.0);
    }

    #[test]
    fn injected_failure_fires_once() {
        let mut remote = InMemoryRemote::new();
        remote.fail_next(CallKind::CreateContainer, RemoteError::Network("down".into()));

        assert!(remote.create_container("A").is_err());
        assert!(remote.create_container("A").is_ok());
        assert_eq!(remote.count(CallKind::CreateContainer), 2);
        assert_eq!(remote.containers().len(), 1);
    }

    #[test]
    fn foreign_entities_are_forbidden() {
        let mut remote = InMemoryRemote::new();
        remote.insert_container("srv-7", "Theirs");
        remote.mark_foreign("srv-7");
        assert_eq!(remote.delete_container("srv-7"), Err(RemoteError::Forbidden));
        assert_eq!(
            remote.create_member(Some("srv-7"), "x"),
            Err(RemoteError::Forbidden)
        );
    }

    #[test]
    fn preloaded_ids_are_not_reissued() {
        let mut remote = InMemoryRemote::new();
        remote.insert_container("srv-4", "Existing");
        assert_eq!(remote.create_container("New").unwrap().id, "srv-5");
    }

    #[test]
    fn delete_of_missing_record_is_forbidden() {
        let mut remote = InMemoryRemote::new();
        remote.insert_container("srv-9", "Old");
        remote.insert_member("srv-10", Some("srv-9"), "Leftover");
        assert_eq!(remote.delete_container("srv-9"), Ok(()));
        assert_eq!(remote.delete_container("srv-9"), Err(RemoteError::Forbidden));

        let target = MemberRef {
            id: "srv-10",
            container_id: Some("srv-9"),
        };
        assert_eq!(remote.delete_member(target), Err(RemoteError::Forbidden));
    }

    #[test]
    fn signed_out_session_is_unauthorized() {
        let mut remote = InMemoryRemote::new();
        remote.set_authenticated(false);
        assert_eq!(remote.list_containers(), Err(RemoteError::Unauthorized));
        assert_eq!(remote.calls(), &[Call::ListContainers]);
    }
}
