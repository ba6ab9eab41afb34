//! libsql store integration tests.
//!
//! Every test opens its own `:memory:` database and resolves through the
//! store exactly as a service would.

use warden::checker;
use warden::registry::flags;
use warden::{AuthScope, GroupLookup, Permissions, Registry, Resolver, Store};

use super::bits;

async fn provisioned(registry: &Registry) -> Store {
    let store = Store::open(":memory:").await.unwrap();
    store.provision_base_group(registry).await.unwrap();
    store
}

/// A fresh user resolves to the registry defaults held by the base group.
#[tokio::test]
async fn fresh_user_gets_registry_defaults() {
    let registry = Registry::standard().unwrap();
    let store = provisioned(&registry).await;

    let perms = Resolver::new(&registry, &store)
        .compute_permissions(AuthScope::Global, 100)
        .await
        .unwrap();
    assert_eq!(perms, registry.default_permissions());
    assert_eq!(
        registry.names(&perms),
        vec!["view_servers", "view_chat", "view_players", "view_records"]
    );
}

/// An unprovisioned database has no base group, so resolution fails.
#[tokio::test]
async fn unprovisioned_store_fails_resolution() {
    let registry = Registry::standard().unwrap();
    let store = Store::open(":memory:").await.unwrap();

    let err = Resolver::new(&registry, &store)
        .compute_permissions(AuthScope::Global, 100)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

/// Groups, resource overrides and user overrides written through the store
/// all feed resolution.
#[tokio::test]
async fn written_layers_drive_resolution() {
    let registry = Registry::standard().unwrap();
    let store = provisioned(&registry).await;

    let moderators = store
        .create_group(
            "moderators",
            &registry.from_names(&["kick_players", "send_chat"]).unwrap(),
            10,
        )
        .await
        .unwrap();
    let server = store.create_resource("survival").await.unwrap();
    store.add_user_to_group(5, moderators.id).await.unwrap();

    // No kicking on the survival server, but bans are fine there.
    store
        .set_resource_overrides(
            server.id,
            moderators.id,
            &bits(&[flags::BAN_PLAYERS]),
            &bits(&[flags::KICK_PLAYERS]),
        )
        .await
        .unwrap();
    // This user may not chat anywhere.
    store
        .set_user_overrides(5, &Permissions::empty(), &bits(&[flags::SEND_CHAT]))
        .await
        .unwrap();

    let resolver = Resolver::new(&registry, &store);

    let global = resolver
        .compute_permissions(AuthScope::Global, 5)
        .await
        .unwrap();
    assert!(global.check_flag(flags::KICK_PLAYERS));
    assert!(!global.check_flag(flags::BAN_PLAYERS));
    assert!(!global.check_flag(flags::SEND_CHAT));

    let on_server = resolver
        .compute_permissions(AuthScope::Resource(server.id), 5)
        .await
        .unwrap();
    assert!(!on_server.check_flag(flags::KICK_PLAYERS));
    assert!(on_server.check_flag(flags::BAN_PLAYERS));
    assert!(on_server.check_flag(flags::VIEW_SERVERS));

    assert!(
        resolver
            .has_permission(AuthScope::Resource(server.id), 5, &checker::can_moderate_players())
            .await
            .unwrap()
    );
}

/// Removing a membership takes the group's grants away.
#[tokio::test]
async fn removed_membership_stops_contributing() {
    let registry = Registry::standard().unwrap();
    let store = provisioned(&registry).await;
    let editors = store
        .create_group("editors", &bits(&[flags::EDIT_RECORDS]), 0)
        .await
        .unwrap();
    store.add_user_to_group(8, editors.id).await.unwrap();

    let resolver = Resolver::new(&registry, &store);
    assert!(
        resolver
            .has_permission(AuthScope::Global, 8, &checker::can_manage_records())
            .await
            .unwrap()
    );

    assert!(store.remove_user_from_group(8, editors.id).await.unwrap());
    assert!(!store.remove_user_from_group(8, editors.id).await.unwrap());
    assert!(store.user_groups(8).await.unwrap().is_empty());
    assert!(
        !resolver
            .has_permission(AuthScope::Global, 8, &checker::can_manage_records())
            .await
            .unwrap()
    );
}

/// The fan-out over stored servers skips deactivated ones.
#[tokio::test]
async fn fanout_over_stored_resources() {
    let registry = Registry::standard().unwrap();
    let store = provisioned(&registry).await;
    let operators = store
        .create_group("operators", &Permissions::empty(), 0)
        .await
        .unwrap();
    store.add_user_to_group(3, operators.id).await.unwrap();

    let mut granted = Vec::new();
    for name in ["lobby", "creative", "hardcore", "archive"] {
        let server = store.create_resource(name).await.unwrap();
        if name != "creative" {
            store
                .set_resource_overrides(
                    server.id,
                    operators.id,
                    &bits(&[flags::EXECUTE_COMMANDS]),
                    &Permissions::empty(),
                )
                .await
                .unwrap();
            granted.push(server.id);
        }
        if name == "archive" {
            store.set_resource_deactivated(server.id, true).await.unwrap();
            granted.pop();
        }
    }

    let mut ids = Resolver::new(&registry, &store)
        .with_concurrency(2)
        .authorized_resources(&store, 3, &checker::can_execute_commands())
        .await
        .unwrap();
    ids.sort_unstable();
    assert_eq!(ids, granted);
}
