//! The reconciliation pass.
//!
//! Lists first, then items. The list phase returns a [`RemapTable`] of
//! placeholder → server ids; the table is applied to every item before the
//! item phase issues its first request, so an item never reaches the server
//! with a placeholder list id. Each confirmed list create also rewrites its
//! items on the spot, so a checkpoint taken mid-phase is self-consistent.
//!
//! Each entity gets at most one request per pass. The local copy changes only
//! on a confirmed result, and `checkpoint` runs after every local change so
//! the caller can persist progress as it goes.

use std::convert::Infallible;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::remap::RemapTable;
use super::remote::{Remote, RemoteError};
use crate::model::{Container, EntityKind, Member, SyncState, Tracked, is_placeholder};
use crate::store::LocalStore;

// ---------------------------------------------------------------------------
// Options and report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Permanent refusals tolerated before an entity is blocked.
    pub max_forbidden_attempts: u32,
    /// Purge local items of a list once its deletion is confirmed.
    pub cascade_deletes: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            max_forbidden_attempts: 1,
            cascade_deletes: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Create,
    Update,
    Delete,
}

/// A request that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedEntity {
    pub kind: EntityKind,
    pub id: String,
    pub operation: Operation,
    pub error: RemoteErrorView,
    pub attempts: u32,
    pub blocked: bool,
}

/// Serializable form of a [`RemoteError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteErrorView {
    pub code: &'static str,
    pub message: String,
}

impl From<&RemoteError> for RemoteErrorView {
    fn from(err: &RemoteError) -> Self {
        Self {
            code: err.code().code(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Dropped locally without a request (abandoned, cascaded, or deleted
    /// along with their list).
    pub purged: usize,
    /// Items left for a later pass because their list has no server id yet.
    pub deferred: usize,
    pub failed: usize,
    /// Failures in this pass that blocked their entity.
    pub blocked: usize,
    /// Entities not attempted because they were already blocked.
    pub skipped_blocked: usize,
    pub remapped: RemapTable,
    /// The server rejected the session; sign in again.
    pub unauthorized: bool,
    pub failures: Vec<FailedEntity>,
    pub pending_after: usize,
}

impl ReconcileReport {
    /// Nothing left to push.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.pending_after == 0
    }

    /// Number of server mutations confirmed in this pass.
    #[must_use]
    pub const fn confirmed(&self) -> usize {
        self.created + self.updated + self.deleted
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    options: ReconcileOptions,
}

impl Reconciler {
    #[must_use]
    pub const fn new(options: ReconcileOptions) -> Self {
        Self { options }
    }

    /// Run one pass without checkpointing.
    pub fn run<R: Remote>(&self, store: &mut LocalStore, remote: &mut R) -> ReconcileReport {
        match self.run_with(store, remote, |_| Ok::<(), Infallible>(())) {
            Ok(report) => report,
            Err(never) => match never {},
        }
    }

    /// Run one pass, calling `checkpoint` after every local change.
    ///
    /// A checkpoint error stops the pass at once. Everything applied so far
    /// is already reflected in `store`.
    pub fn run_with<R, E, F>(
        &self,
        store: &mut LocalStore,
        remote: &mut R,
        mut checkpoint: F,
    ) -> Result<ReconcileReport, E>
    where
        R: Remote,
        F: FnMut(&LocalStore) -> Result<(), E>,
    {
        let mut report = ReconcileReport::default();
        debug!(pending = store.pending_count(), "reconcile pass starting");

        let remap = self.sync_containers(store, remote, &mut report, &mut checkpoint)?;
        let rewritten = store.apply_remap(&remap);
        if rewritten > 0 {
            debug!(rewritten, "remapped item list ids");
            checkpoint(store)?;
        }
        report.remapped = remap;

        self.sync_members(store, remote, &mut report, &mut checkpoint)?;

        report.pending_after = store.pending_count();
        info!(
            created = report.created,
            updated = report.updated,
            deleted = report.deleted,
            failed = report.failed,
            pending = report.pending_after,
            "reconcile pass finished"
        );
        Ok(report)
    }

    fn sync_containers<R, E, F>(
        &self,
        store: &mut LocalStore,
        remote: &mut R,
        report: &mut ReconcileReport,
        checkpoint: &mut F,
    ) -> Result<RemapTable, E>
    where
        R: Remote,
        F: FnMut(&LocalStore) -> Result<(), E>,
    {
        let mut remap = RemapTable::new();
        let ids: Vec<String> = store.containers().iter().map(|c| c.id.clone()).collect();

        for id in ids {
            let Some(container) = store.container(&id) else {
                continue;
            };
            let state = container.sync;
            if state == SyncState::Clean {
                continue;
            }
            if container.is_blocked() {
                debug!(id = %id, "list blocked, skipping");
                report.skipped_blocked += 1;
                continue;
            }
            debug!(id = %id, %state, "dispatching list");

            match state {
                SyncState::Clean => {}
                SyncState::Abandoned => {
                    store.purge(&id);
                    if self.options.cascade_deletes {
                        report.purged += store.purge_members_of(&id);
                    }
                    report.purged += 1;
                }
                SyncState::PendingCreate => {
                    let title = container.title.clone();
                    match remote.create_container(&title) {
                        Ok(record) => {
                            info!(placeholder = %id, id = %record.id, "list created");
                            let new_id = record.id.clone();
                            store.replace_container(&id, record);
                            // A checkpoint must never persist items that point
                            // at a placeholder the store no longer holds.
                            store.rewrite_container_refs(&id, &new_id);
                            remap.insert(id, new_id);
                            report.created += 1;
                        }
                        Err(err) => {
                            self.fail::<Container>(
                                store,
                                report,
                                &id,
                                Operation::Create,
                                &err,
                            );
                        }
                    }
                }
                SyncState::PendingUpdate => {
                    let fields = container.fields();
                    match remote.update_container(&id, &fields) {
                        Ok(record) => {
                            info!(id = %id, "list updated");
                            store.replace_container(&id, record);
                            report.updated += 1;
                        }
                        Err(err) => {
                            self.fail::<Container>(
                                store,
                                report,
                                &id,
                                Operation::Update,
                                &err,
                            );
                        }
                    }
                }
                SyncState::PendingDelete => match remote.delete_container(&id) {
                    Ok(()) | Err(RemoteError::NotFound) => {
                        info!(id = %id, "list deleted");
                        store.purge(&id);
                        report.deleted += 1;
                        // The server drops a list's items with it; queued
                        // deletes for them have nothing left to hit.
                        report.purged += if self.options.cascade_deletes {
                            store.purge_members_of(&id)
                        } else {
                            store.purge_deleted_members_of(&id)
                        };
                    }
                    Err(err) => {
                        self.fail::<Container>(
                            store,
                            report,
                            &id,
                            Operation::Delete,
                            &err,
                        );
                    }
                },
            }
            checkpoint(store)?;
        }

        Ok(remap)
    }

    fn sync_members<R, E, F>(
        &self,
        store: &mut LocalStore,
        remote: &mut R,
        report: &mut ReconcileReport,
        checkpoint: &mut F,
    ) -> Result<(), E>
    where
        R: Remote,
        F: FnMut(&LocalStore) -> Result<(), E>,
    {
        let ids: Vec<String> = store.members().iter().map(|m| m.id.clone()).collect();

        for id in ids {
            let Some(member) = store.member(&id) else {
                continue;
            };
            let state = member.sync;
            if state == SyncState::Clean {
                continue;
            }
            if member.is_blocked() {
                debug!(id = %id, "item blocked, skipping");
                report.skipped_blocked += 1;
                continue;
            }
            debug!(id = %id, %state, "dispatching item");

            match state {
                SyncState::Clean => {}
                SyncState::Abandoned => {
                    store.purge(&id);
                    report.purged += 1;
                }
                SyncState::PendingCreate => {
                    if let Some(list) = member.container_id.as_deref().filter(|l| is_placeholder(l))
                    {
                        if self.options.cascade_deletes && store.container(list).is_none() {
                            debug!(id = %id, list, "list gone, dropping item");
                            store.purge(&id);
                            report.purged += 1;
                            checkpoint(store)?;
                        } else {
                            debug!(id = %id, list, "list not created yet, deferring item");
                            report.deferred += 1;
                        }
                        continue;
                    }

                    let list = member.container_id.clone();
                    let title = member.title.clone();
                    let completed = member.completed;
                    match remote.create_member(list.as_deref(), &title) {
                        Ok(record) => {
                            info!(placeholder = %id, id = %record.id, "item created");
                            let new_id = record.id.clone();
                            let server_completed = record.completed;
                            store.replace_member(&id, record);
                            if completed != server_completed {
                                if let Some(created) = store.member_mut(&new_id) {
                                    created.completed = completed;
                                    created.sync = SyncState::PendingUpdate;
                                }
                            }
                            report.created += 1;
                        }
                        Err(err) => {
                            self.fail::<Member>(
                                store,
                                report,
                                &id,
                                Operation::Create,
                                &err,
                            );
                        }
                    }
                }
                SyncState::PendingUpdate => {
                    let fields = member.fields();
                    match remote.update_member(member.target(), &fields) {
                        Ok(record) => {
                            info!(id = %id, "item updated");
                            store.replace_member(&id, record);
                            report.updated += 1;
                        }
                        Err(err) => {
                            self.fail::<Member>(
                                store,
                                report,
                                &id,
                                Operation::Update,
                                &err,
                            );
                        }
                    }
                }
                SyncState::PendingDelete => match remote.delete_member(member.target()) {
                    Ok(()) | Err(RemoteError::NotFound) => {
                        info!(id = %id, "item deleted");
                        store.purge(&id);
                        report.deleted += 1;
                    }
                    Err(err) => {
                        self.fail::<Member>(
                            store,
                            report,
                            &id,
                            Operation::Delete,
                            &err,
                        );
                    }
                },
            }
            checkpoint(store)?;
        }

        Ok(())
    }

    /// Record a failed request. The entity keeps its state; permanent
    /// refusals block it once the attempt cap is reached.
    fn fail<T: Tracked>(
        &self,
        store: &mut LocalStore,
        report: &mut ReconcileReport,
        id: &str,
        operation: Operation,
        err: &RemoteError,
    ) {
        let permanent = matches!(err, RemoteError::Forbidden)
            || (matches!(err, RemoteError::NotFound) && operation == Operation::Update);
        if matches!(err, RemoteError::Unauthorized) {
            report.unauthorized = true;
        }

        let failure = store.record_failure(
            id,
            err.to_string(),
            permanent,
            self.options.max_forbidden_attempts,
        );
        let (attempts, blocked) = failure.map_or((0, false), |f| (f.attempts, f.blocked));

        report.failed += 1;
        if blocked {
            report.blocked += 1;
        }
        warn!(
            kind = %T::KIND,
            id,
            ?operation,
            error = %err,
            attempts,
            blocked,
            "sync request failed"
        );
        report.failures.push(FailedEntity {
            kind: T::KIND,
            id: id.to_string(),
            operation,
            error: RemoteErrorView::from(err),
            attempts,
            blocked,
        });
    }
}
