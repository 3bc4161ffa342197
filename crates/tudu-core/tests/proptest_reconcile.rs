use proptest::prelude::*;
use std::collections::BTreeSet;

use tudu_core::model::{ContainerPatch, MemberPatch, NewContainer, NewMember, is_placeholder};
use tudu_core::store::LocalStore;
use tudu_core::sync::memory::{Call, CallKind, InMemoryRemote};
use tudu_core::sync::{ReconcileOptions, Reconciler, RemoteError};

/// One user action, with indices resolved modulo whatever exists at the time.
#[derive(Debug, Clone)]
enum Step {
    AddList(String),
    AddItem { list: Option<usize>, title: String },
    Rename(usize, String),
    Toggle(usize),
    RemoveList(usize),
    RemoveItem(usize),
    Sync,
    /// Make the next request of this kind fail with a network error.
    Drop(CallKind),
}

fn arb_title() -> impl Strategy<Value = String> {
    "[a-z][a-z ]{0,11}"
}

fn arb_kind() -> impl Strategy<Value = CallKind> {
    prop_oneof![
        Just(CallKind::CreateContainer),
        Just(CallKind::UpdateContainer),
        Just(CallKind::DeleteContainer),
        Just(CallKind::CreateMember),
        Just(CallKind::UpdateMember),
        Just(CallKind::DeleteMember),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => arb_title().prop_map(Step::AddList),
        5 => (proptest::option::of(0..8usize), arb_title())
            .prop_map(|(list, title)| Step::AddItem { list, title }),
        2 => (0..8usize, arb_title()).prop_map(|(i, t)| Step::Rename(i, t)),
        3 => (0..8usize).prop_map(Step::Toggle),
        1 => (0..8usize).prop_map(Step::RemoveList),
        2 => (0..8usize).prop_map(Step::RemoveItem),
        2 => Just(Step::Sync),
        1 => arb_kind().prop_map(Step::Drop),
    ]
}

fn pick<T: Clone>(items: &[T], index: usize) -> Option<T> {
    if items.is_empty() {
        None
    } else {
        Some(items[index % items.len()].clone())
    }
}

fn apply(step: &Step, store: &mut LocalStore, remote: &mut InMemoryRemote, sync: &Reconciler) {
    let lists: Vec<String> = store.visible_containers().map(|c| c.id.clone()).collect();
    let items: Vec<String> = store
        .members()
        .iter()
        .filter(|m| m.sync.is_live())
        .map(|m| m.id.clone())
        .collect();

    match step {
        Step::AddList(title) => {
            store
                .create_container(NewContainer {
                    title: title.clone(),
                    position: None,
                })
                .unwrap();
        }
        Step::AddItem { list, title } => {
            let container_id = list.and_then(|i| pick(&lists, i));
            store
                .create_member(NewMember {
                    container_id,
                    title: title.clone(),
                })
                .unwrap();
        }
        Step::Rename(i, title) => {
            if let Some(id) = pick(&lists, *i) {
                let patch = ContainerPatch {
                    title: Some(title.clone()),
                    ..ContainerPatch::default()
                };
                store.update_container(&id, &patch).unwrap();
            }
        }
        Step::Toggle(i) => {
            if let Some(id) = pick(&items, *i) {
                let completed = store.member(&id).is_some_and(|m| m.completed);
                let patch = MemberPatch {
                    completed: Some(!completed),
                    ..MemberPatch::default()
                };
                store.update_member(&id, &patch).unwrap();
            }
        }
        Step::RemoveList(i) => {
            if let Some(id) = pick(&lists, *i) {
                store.remove(&id).unwrap();
            }
        }
        Step::RemoveItem(i) => {
            if let Some(id) = pick(&items, *i) {
                store.remove(&id).unwrap();
            }
        }
        Step::Sync => {
            sync.run(store, remote);
        }
        Step::Drop(kind) => {
            remote.fail_next(*kind, RemoteError::Network("dropped".into()));
        }
    }
}

fn no_placeholder_reached_server(remote: &InMemoryRemote) -> bool {
    remote.calls().iter().all(|call| match call {
        Call::CreateMember { container_id, .. }
        | Call::UpdateMember { container_id, .. }
        | Call::DeleteMember { container_id, .. } => {
            container_id.as_deref().is_none_or(|l| !is_placeholder(l))
        }
        Call::UpdateContainer { id } | Call::DeleteContainer { id } => !is_placeholder(id),
        Call::CreateContainer { .. } | Call::ListContainers | Call::ListMembers { .. } => true,
    })
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn store_and_server_converge(steps in proptest::collection::vec(arb_step(), 0..40)) {
        let sync = Reconciler::new(ReconcileOptions {
            cascade_deletes: true,
            ..ReconcileOptions::default()
        });
        let mut store = LocalStore::new();
        let mut remote = InMemoryRemote::new();

        for step in &steps {
            apply(step, &mut store, &mut remote, &sync);
        }

        remote.clear_failures();
        // Creates that carried a local edit need one more pass to push it.
        sync.run(&mut store, &mut remote);
        let last = sync.run(&mut store, &mut remote);

        prop_assert!(last.is_settled(), "still pending: {:?}", store.pending_summary());
        prop_assert!(no_placeholder_reached_server(&remote));

        let local_lists: BTreeSet<&str> = store.containers().iter().map(|c| c.id.as_str()).collect();
        let server_lists: BTreeSet<&str> = remote.containers().iter().map(|c| c.id.as_str()).collect();
        prop_assert_eq!(local_lists, server_lists);

        let local_items: BTreeSet<&str> = store.members().iter().map(|m| m.id.as_str()).collect();
        let server_items: BTreeSet<&str> = remote.members().iter().map(|m| m.id.as_str()).collect();
        prop_assert_eq!(local_items, server_items);

        for member in store.members() {
            let on_server = remote.member(&member.id).unwrap();
            prop_assert_eq!(&member.title, &on_server.title);
            prop_assert_eq!(member.completed, on_server.completed);
            prop_assert_eq!(&member.container_id, &on_server.container_id);
        }
    }

    #[test]
    fn each_entity_is_sent_at_most_once_per_pass(steps in proptest::collection::vec(arb_step(), 0..30)) {
        let sync = Reconciler::default();
        let mut store = LocalStore::new();
        let mut remote = InMemoryRemote::new();
        for step in steps.iter().filter(|s| !matches!(s, Step::Sync | Step::Drop(_))) {
            apply(step, &mut store, &mut remote, &sync);
        }

        let pending = store.pending_count();
        let report = sync.run(&mut store, &mut remote);

        prop_assert!(remote.mutation_count() <= pending);
        prop_assert_eq!(remote.count(CallKind::CreateContainer), report.remapped.len());
        prop_assert_eq!(report.failed, 0);
    }
}
