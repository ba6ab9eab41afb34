//! Resource fan-out tests.

use warden::checker;
use warden::model::BASE_GROUP_ID;
use warden::registry::flags;
use warden::{Group, MemoryStore, Overrides, Registry, Resolver, Resource};

use super::bits;

fn store_with_servers(count: i64) -> MemoryStore {
    let store = MemoryStore::new();
    store
        .insert_group(Group::new(BASE_GROUP_ID, "everyone", &bits(&[])))
        .unwrap();
    store.insert_group(Group::new(2, "staff", &bits(&[]))).unwrap();
    for id in 1..=count {
        store
            .insert_resource(Resource {
                id,
                name: format!("server-{id}"),
                deactivated: false,
            })
            .unwrap();
    }
    store
}

/// Four servers; the user's group may view only servers 1 and 3.
#[tokio::test]
async fn returns_exactly_the_accepted_resources() {
    let registry = Registry::standard().unwrap();
    let store = store_with_servers(4);
    store.add_member(7, 2).unwrap();
    for server in [1, 3] {
        store
            .set_resource_overrides(
                server,
                Overrides {
                    group_id: Some(2),
                    allow: bits(&[flags::VIEW_SERVERS]).to_string(),
                    deny: "0".into(),
                },
            )
            .unwrap();
    }

    for concurrency in [1, 2, 8] {
        let resolver = Resolver::new(&registry, &store).with_concurrency(concurrency);
        let mut ids = resolver
            .authorized_resources(&store, 7, &checker::can_view_server())
            .await
            .unwrap();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 3], "concurrency {concurrency}");
    }
}

/// No accepted resource is reported as NotFound, not as an empty list.
#[tokio::test]
async fn no_accepted_resource_is_not_found() {
    let registry = Registry::standard().unwrap();
    let store = store_with_servers(4);
    let resolver = Resolver::new(&registry, &store);

    let err = resolver
        .authorized_resources(&store, 7, &checker::can_view_server())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

/// Administrators pass the named checkers on every active resource.
#[tokio::test]
async fn administrators_see_every_active_resource() {
    let registry = Registry::standard().unwrap();
    let store = store_with_servers(3);
    store
        .insert_group(Group::new(4, "admins", &bits(&[flags::ADMINISTRATOR])))
        .unwrap();
    store.add_member(1, 4).unwrap();
    store
        .insert_resource(Resource {
            id: 2,
            name: "retired".into(),
            deactivated: true,
        })
        .unwrap();

    let mut ids = Resolver::new(&registry, &store)
        .authorized_resources(&store, 1, &checker::can_execute_commands())
        .await
        .unwrap();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 3]);
}

/// A resource whose permissions cannot be computed is skipped; the user
/// keeps access to every other resource.
#[tokio::test]
async fn unresolvable_resource_does_not_hide_the_rest() {
    let registry = Registry::standard().unwrap();
    let store = store_with_servers(3);
    store.add_member(7, 2).unwrap();
    store
        .set_resource_overrides(
            2,
            Overrides {
                group_id: Some(2),
                allow: "bad".into(),
                deny: "0".into(),
            },
        )
        .unwrap();

    let mut ids = Resolver::new(&registry, &store)
        .authorized_resources(&store, 7, &checker::allow_all())
        .await
        .unwrap();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 3]);
}
