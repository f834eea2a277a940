//! Workload cache behaviour under notification sequences and concurrent reads.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lumen_metadata::{OwnerReference, ReplicaSetObject, WatchEvent, WorkloadCache, WorkloadIdentity};
use proptest::prelude::*;

fn object(
    name: &str,
    version: &str,
    owner: Option<(&str, &str)>,
    labels: &[(&str, &str)],
) -> ReplicaSetObject {
    ReplicaSetObject {
        namespace: "ns1".to_owned(),
        name: name.to_owned(),
        resource_version: version.to_owned(),
        owner: owner.map(|(name, kind)| OwnerReference {
            name: name.to_owned(),
            kind: kind.to_owned(),
            api_version: "apps/v1".to_owned(),
        }),
        labels: labels
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect(),
    }
}

// =============================================================================
// End-to-end scenarios
// =============================================================================

#[test]
fn add_lookup_delete_scenario() {
    let cache = WorkloadCache::new();
    let rs_a = object("rs-A", "1", Some(("deploy-A", "Deployment")), &[("app", "A")]);

    cache.on_add(&rs_a);
    let found = cache.lookup("ns1", "rs-A").expect("entry after add");
    assert_eq!(found.controller.name, "deploy-A");
    assert_eq!(found.controller.kind, "Deployment");
    assert_eq!(found.labels.get("app").map(String::as_str), Some("A"));

    cache.on_delete(&rs_a);
    assert!(cache.lookup("ns1", "rs-A").is_none());
}

#[test]
fn add_without_owner_scenario() {
    let cache = WorkloadCache::new();
    cache.on_add(&object("rs-B", "1", None, &[("app", "B")]));
    assert!(cache.lookup("ns1", "rs-B").is_none());
}

#[test]
fn same_version_update_scenario() {
    let cache = WorkloadCache::new();
    let before = object("rs-C", "1", Some(("deploy-C", "Deployment")), &[("app", "C")]);
    cache.on_add(&before);
    let snapshot = cache.lookup("ns1", "rs-C").expect("entry after add");

    let changed = object("rs-C", "1", Some(("other", "StatefulSet")), &[("app", "X")]);
    cache.on_update(&before, &changed);

    let after = cache.lookup("ns1", "rs-C").expect("entry still present");
    assert_eq!(*after, *snapshot);
    assert!(Arc::ptr_eq(&after, &snapshot));
}

#[test]
fn update_of_absent_key_acts_as_add() {
    let cache = WorkloadCache::new();
    let old = object("rs-D", "1", Some(("deploy-D", "Deployment")), &[]);
    let new = object("rs-D", "2", Some(("deploy-D2", "Deployment")), &[("app", "D")]);

    cache.on_update(&old, &new);

    let found = cache.lookup("ns1", "rs-D").expect("entry after update");
    assert_eq!(found.controller.name, "deploy-D2");
    assert_eq!(found.labels.get("app").map(String::as_str), Some("D"));
    assert_eq!(cache.len(), 1);
}

#[test]
fn delete_of_absent_key_is_noop() {
    let cache = WorkloadCache::new();
    cache.on_delete(&object("rs-none", "1", Some(("d", "Deployment")), &[]));
    assert!(cache.is_empty());
}

// =============================================================================
// Last-notification law
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add { key: usize, owner: Option<usize> },
    Update { key: usize, owner: Option<usize>, bump: bool },
    Delete { key: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let owner = prop::option::of(0usize..3);
    prop_oneof![
        (0usize..4, owner.clone()).prop_map(|(key, owner)| Op::Add { key, owner }),
        (0usize..4, owner, any::<bool>()).prop_map(|(key, owner, bump)| Op::Update {
            key,
            owner,
            bump
        }),
        (0usize..4).prop_map(|key| Op::Delete { key }),
    ]
}

fn owner_ref(idx: Option<usize>) -> Option<(String, String)> {
    idx.map(|i| (format!("deploy-{i}"), "Deployment".to_owned()))
}

fn make(key: usize, version: u64, owner: &Option<(String, String)>) -> ReplicaSetObject {
    object(
        &format!("rs-{key}"),
        &version.to_string(),
        owner.as_ref().map(|(n, k)| (n.as_str(), k.as_str())),
        &[("key", key.to_string().as_str())],
    )
}

/// Turns generated ops into the notifications a watch would deliver:
/// versions never decrease per key and a same-version update repeats the
/// current object.
fn notifications(ops: &[Op]) -> (Vec<WatchEvent>, HashMap<String, Option<ReplicaSetObject>>) {
    let mut versions: HashMap<usize, u64> = HashMap::new();
    let mut current: HashMap<usize, ReplicaSetObject> = HashMap::new();
    let mut last: HashMap<String, Option<ReplicaSetObject>> = HashMap::new();
    let mut events = Vec::new();

    for op in ops {
        match op {
            Op::Add { key, owner } => {
                let version = versions.entry(*key).or_default();
                *version += 1;
                let obj = make(*key, *version, &owner_ref(*owner));
                // a watch reports a known object as an update
                let event = match current.insert(*key, obj.clone()) {
                    Some(old) => WatchEvent::Updated {
                        old,
                        new: obj.clone(),
                    },
                    None => WatchEvent::Added(obj.clone()),
                };
                last.insert(obj.key(), Some(obj));
                events.push(event);
            }
            Op::Update { key, owner, bump } => {
                let Some(old) = current.get(key).cloned() else {
                    // a key the cache never saw, e.g. after a missed add
                    let version = versions.entry(*key).or_default();
                    let old = make(*key, *version, &None);
                    *version += 1;
                    let new = make(*key, *version, &owner_ref(*owner));
                    current.insert(*key, new.clone());
                    last.insert(new.key(), Some(new.clone()));
                    events.push(WatchEvent::Updated { old, new });
                    continue;
                };
                let new = if *bump {
                    let version = versions.entry(*key).or_default();
                    *version += 1;
                    make(*key, *version, &owner_ref(*owner))
                } else {
                    old.clone()
                };
                current.insert(*key, new.clone());
                last.insert(new.key(), Some(new.clone()));
                events.push(WatchEvent::Updated { old, new });
            }
            Op::Delete { key } => {
                let obj = current
                    .remove(key)
                    .unwrap_or_else(|| make(*key, versions.get(key).copied().unwrap_or(0), &None));
                last.insert(obj.key(), None);
                events.push(WatchEvent::Deleted(obj));
            }
        }
    }
    (events, last)
}

proptest! {
    #[test]
    fn final_state_follows_last_notification_per_key(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let (events, last) = notifications(&ops);
        let cache = WorkloadCache::new();
        for event in &events {
            cache.apply(event);
        }

        let mut expected_len = 0;
        for (key, obj) in &last {
            let name = key.trim_start_matches("ns1/");
            let expected = obj.as_ref().and_then(WorkloadIdentity::from_object);
            if expected.is_some() {
                expected_len += 1;
            }
            let actual = cache.lookup("ns1", name).map(|identity| (*identity).clone());
            prop_assert_eq!(actual, expected, "key {}", key);
        }
        prop_assert_eq!(cache.len(), expected_len);
    }

    #[test]
    fn same_version_update_never_changes_content(
        owner_a in prop::option::of(0usize..3),
        owner_b in prop::option::of(0usize..3),
    ) {
        let cache = WorkloadCache::new();
        let old = make(1, 7, &owner_ref(owner_a));
        cache.on_add(&old);
        let before = cache.lookup("ns1", "rs-1").map(|identity| (*identity).clone());

        cache.on_update(&old, &make(1, 7, &owner_ref(owner_b)));

        let after = cache.lookup("ns1", "rs-1").map(|identity| (*identity).clone());
        prop_assert_eq!(before, after);
    }
}

// =============================================================================
// Concurrent readers
// =============================================================================

#[test]
fn readers_never_observe_torn_records() {
    let cache = WorkloadCache::new();
    let revision = |i: u32| {
        let rev = i.to_string();
        object(
            "rs-hot",
            &rev,
            Some((
                format!("deploy-{rev}").as_str(),
                format!("Kind{rev}").as_str(),
            )),
            &[("rev", rev.as_str())],
        )
    };
    cache.on_add(&revision(0));

    let done = AtomicBool::new(false);
    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 1..5_000u32 {
                cache.on_update(&revision(i - 1), &revision(i));
            }
            done.store(true, Ordering::Release);
        });

        for _ in 0..4 {
            s.spawn(|| {
                let mut observed = 0u64;
                while !done.load(Ordering::Acquire) {
                    // absent is allowed mid-update
                    if let Some(identity) = cache.lookup("ns1", "rs-hot") {
                        let rev = identity.labels.get("rev").expect("rev label");
                        assert_eq!(identity.controller.name, format!("deploy-{rev}"));
                        assert_eq!(identity.controller.kind, format!("Kind{rev}"));
                        observed += 1;
                    }
                }
                observed
            });
        }
    });

    let last = cache.lookup("ns1", "rs-hot").expect("final entry");
    assert_eq!(last.controller.name, "deploy-4999");
}
