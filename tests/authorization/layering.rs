//! Resolution layering tests.
//!
//! Drives [`Resolver::compute_permissions`] through an in-memory backend and
//! checks how the base group, group union, resource overrides and user
//! overrides combine.

use warden::checker;
use warden::model::{BASE_GROUP_ID, GroupId, ResourceId, UserId};
use warden::registry::{FlagScope, FlagSpec};
use warden::{
    AuthScope, Error, ErrorKind, Group, GroupLookup, MemoryStore, Overrides, Registry, Resolver,
};

use super::bits;

const USER: UserId = 42;
const RESOURCE: ResourceId = 9;

fn overrides(group_id: Option<GroupId>, allow: &[usize], deny: &[usize]) -> Overrides {
    Overrides {
        group_id,
        allow: bits(allow).to_string(),
        deny: bits(deny).to_string(),
    }
}

/// Base {0,7}; the user is in G2 {0,1} and G3 {1,3,4,5}. G2 carries a
/// resource override, G3 none, and the user has overrides of their own.
fn layered_store() -> MemoryStore {
    let store = MemoryStore::new();
    store
        .insert_group(Group::new(BASE_GROUP_ID, "everyone", &bits(&[0, 7])))
        .unwrap();
    store.insert_group(Group::new(2, "g2", &bits(&[0, 1]))).unwrap();
    store
        .insert_group(Group::new(3, "g3", &bits(&[1, 3, 4, 5])))
        .unwrap();
    store.add_member(USER, 2).unwrap();
    store.add_member(USER, 3).unwrap();
    store
        .set_resource_overrides(RESOURCE, overrides(Some(2), &[1, 5, 6], &[0, 5, 6]))
        .unwrap();
    store
        .set_user_overrides(USER, overrides(None, &[1, 2, 5], &[2, 3]))
        .unwrap();
    store
}

/// Eight flags, the last of which only means something application-wide.
fn eight_flag_registry() -> Registry {
    const NAMES: [&str; 8] = ["f0", "f1", "f2", "f3", "f4", "f5", "f6", "f7"];
    let specs: Vec<FlagSpec> = NAMES
        .iter()
        .enumerate()
        .map(|(bit, &name)| FlagSpec {
            name,
            description: "",
            scope: if bit == 7 {
                FlagScope::AppOnly
            } else {
                FlagScope::Any
            },
            default: false,
        })
        .collect();
    Registry::register_all(&specs).unwrap()
}

/// Full resource-scoped resolution. Bit 7 comes from the base group and no
/// layer denies it, so it survives into the computed vector.
#[tokio::test]
async fn resource_scope_applies_every_layer() {
    let registry = Registry::standard().unwrap();
    let store = layered_store();
    let resolver = Resolver::new(&registry, &store);

    let perms = resolver
        .compute_permissions(AuthScope::Resource(RESOURCE), USER)
        .await
        .unwrap();
    assert_eq!(perms, bits(&[1, 2, 4, 5, 6, 7]));
}

/// The displayed vector drops the app-only bit 7 at resource scope, leaving
/// {1,2,4,5,6}.
#[tokio::test]
async fn visible_permissions_drop_app_only_bits_at_resource_scope() {
    let registry = eight_flag_registry();
    let store = layered_store();
    let resolver = Resolver::new(&registry, &store);

    let perms = resolver
        .visible_permissions(AuthScope::Resource(RESOURCE), USER)
        .await
        .unwrap();
    assert_eq!(perms, bits(&[1, 2, 4, 5, 6]));

    let global = resolver
        .visible_permissions(AuthScope::Global, USER)
        .await
        .unwrap();
    assert!(global.check_flag(7));
}

/// Global scope never consults resource overrides.
#[tokio::test]
async fn global_scope_skips_resource_overrides() {
    let registry = Registry::standard().unwrap();
    let store = layered_store();
    let resolver = Resolver::new(&registry, &store);

    let perms = resolver
        .compute_permissions(AuthScope::Global, USER)
        .await
        .unwrap();
    // {0,1,3,4,5,7}, then user deny {2,3} and allow {1,2,5}
    assert_eq!(perms, bits(&[0, 1, 2, 4, 5, 7]));
}

/// Without a base group resolution fails; it never degrades to an empty
/// success.
#[tokio::test]
async fn missing_base_group_is_an_error() {
    let registry = Registry::standard().unwrap();
    let store = MemoryStore::new();
    store.insert_group(Group::new(2, "g2", &bits(&[0]))).unwrap();
    store.add_member(USER, 2).unwrap();
    let resolver = Resolver::new(&registry, &store);

    let err = resolver
        .compute_permissions(AuthScope::Global, USER)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().starts_with("get base group"));
}

/// A user with no groups and no overrides gets exactly the base group.
#[tokio::test]
async fn missing_groups_and_overrides_fall_back_to_base() {
    let registry = Registry::standard().unwrap();
    let store = MemoryStore::new();
    store
        .insert_group(Group::new(BASE_GROUP_ID, "everyone", &bits(&[5, 9])))
        .unwrap();
    let resolver = Resolver::new(&registry, &store);

    for scope in [AuthScope::Global, AuthScope::Resource(RESOURCE)] {
        let perms = resolver.compute_permissions(scope, USER).await.unwrap();
        assert_eq!(perms, bits(&[5, 9]), "scope {scope}");
    }
}

/// One group's resource allow restores a bit another group's resource deny
/// removed, whichever order the groups come back in.
#[tokio::test]
async fn resource_allows_land_after_every_deny() {
    let registry = Registry::standard().unwrap();
    for (first, second) in [(2, 3), (3, 2)] {
        let store = MemoryStore::new();
        store
            .insert_group(Group::new(BASE_GROUP_ID, "everyone", &bits(&[4])))
            .unwrap();
        store
            .insert_group(Group::new(first, "denier", &bits(&[])))
            .unwrap();
        store
            .insert_group(Group::new(second, "allower", &bits(&[])))
            .unwrap();
        store.add_member(USER, first).unwrap();
        store.add_member(USER, second).unwrap();
        store
            .set_resource_overrides(RESOURCE, overrides(Some(first), &[], &[4]))
            .unwrap();
        store
            .set_resource_overrides(RESOURCE, overrides(Some(second), &[4], &[]))
            .unwrap();

        let perms = Resolver::new(&registry, &store)
            .compute_permissions(AuthScope::Resource(RESOURCE), USER)
            .await
            .unwrap();
        assert!(perms.check_flag(4), "denier group {first}");
    }
}

/// Wraps a [`MemoryStore`] whose user override lookup is down.
struct FlakyOverrides(MemoryStore);

impl GroupLookup for FlakyOverrides {
    async fn base_group(&self) -> warden::Result<Group> {
        self.0.base_group().await
    }

    async fn user_groups(&self, user_id: UserId) -> warden::Result<Vec<Group>> {
        self.0.user_groups(user_id).await
    }

    async fn user_overrides(&self, _user_id: UserId) -> warden::Result<Overrides> {
        Err(Error::Upstream("connection reset".into()))
    }

    async fn resource_overrides(
        &self,
        resource_id: ResourceId,
        group_id: GroupId,
    ) -> warden::Result<Overrides> {
        self.0.resource_overrides(resource_id, group_id).await
    }
}

/// A lookup failure other than NotFound aborts resolution, tagged with the
/// step that failed.
#[tokio::test]
async fn upstream_failure_names_the_failing_step() {
    let registry = Registry::standard().unwrap();
    let store = FlakyOverrides(layered_store());
    let resolver = Resolver::new(&registry, &store);

    let err = resolver
        .compute_permissions(AuthScope::Global, USER)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Upstream);
    assert_eq!(
        err.to_string(),
        "get user overrides: Upstream error: connection reset"
    );
}

/// A group whose stored permission string is corrupt fails resolution.
#[tokio::test]
async fn corrupt_stored_permissions_fail_resolution() {
    let registry = Registry::standard().unwrap();
    let store = layered_store();
    let mut corrupt = Group::new(5, "corrupt", &bits(&[]));
    corrupt.permissions = "12ab".into();
    store.insert_group(corrupt).unwrap();
    store.add_member(USER, 5).unwrap();

    let err = Resolver::new(&registry, &store)
        .compute_permissions(AuthScope::Global, USER)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

/// Scope text that is neither `global` nor `resource:<id>` is rejected.
#[test]
fn invalid_scope_is_rejected() {
    for raw in ["", "guild", "resource:", "resource:abc", "resource:-"] {
        let err = raw.parse::<AuthScope>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidScope, "input {raw:?}");
    }
    assert_eq!("resource:12".parse::<AuthScope>().unwrap(), AuthScope::Resource(12));
}

/// The admin checker only looks at the administrator bit.
#[tokio::test]
async fn require_admin_ignores_other_bits() {
    let registry = Registry::standard().unwrap();
    let store = layered_store();
    let resolver = Resolver::new(&registry, &store);

    // Bit 0 is the administrator flag; the user override chain keeps it at
    // global scope and the resource deny removes it.
    assert!(
        resolver
            .has_permission(AuthScope::Global, USER, &checker::require_admin())
            .await
            .unwrap()
    );
    assert!(
        !resolver
            .has_permission(AuthScope::Resource(RESOURCE), USER, &checker::require_admin())
            .await
            .unwrap()
    );
}
