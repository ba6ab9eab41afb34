//! In-memory lookup backend.
//!
//! Implements [`GroupLookup`] and [`ResourceLookup`] over plain maps. Useful
//! for tests and for embedding the resolver where groups are loaded from
//! somewhere other than the database.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};
use crate::lookup::{GroupLookup, ResourceLookup};
use crate::model::{BASE_GROUP_ID, Group, GroupId, Overrides, Resource, ResourceId, UserId};

#[derive(Default)]
struct State {
    groups: BTreeMap<GroupId, Group>,
    members: HashMap<UserId, BTreeSet<GroupId>>,
    user_overrides: HashMap<UserId, Overrides>,
    resource_overrides: HashMap<(ResourceId, GroupId), Overrides>,
    resources: BTreeMap<ResourceId, Resource>,
}

/// Map-backed store.
///
/// `user_groups` reports a user without memberships as NotFound, the same
/// way a storage layer that treats "no rows" as absent would.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| Error::Internal(format!("memory store lock poisoned: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| Error::Internal(format!("memory store lock poisoned: {e}")))
    }

    /// Insert or replace a group.
    pub fn insert_group(&self, group: Group) -> Result<()> {
        self.write()?.groups.insert(group.id, group);
        Ok(())
    }

    /// Make `user_id` a member of an existing group.
    pub fn add_member(&self, user_id: UserId, group_id: GroupId) -> Result<()> {
        let mut state = self.write()?;
        if !state.groups.contains_key(&group_id) {
            return Err(Error::NotFound(format!("group {group_id}")));
        }
        state.members.entry(user_id).or_default().insert(group_id);
        Ok(())
    }

    pub fn set_user_overrides(&self, user_id: UserId, overrides: Overrides) -> Result<()> {
        self.write()?.user_overrides.insert(user_id, overrides);
        Ok(())
    }

    /// Store a group's overrides on a resource. `overrides.group_id` names
    /// the group and must be set.
    pub fn set_resource_overrides(
        &self,
        resource_id: ResourceId,
        overrides: Overrides,
    ) -> Result<()> {
        let group_id = overrides
            .group_id
            .ok_or_else(|| Error::Internal("resource overrides need a group id".into()))?;
        self.write()?
            .resource_overrides
            .insert((resource_id, group_id), overrides);
        Ok(())
    }

    pub fn insert_resource(&self, resource: Resource) -> Result<()> {
        self.write()?.resources.insert(resource.id, resource);
        Ok(())
    }
}

impl GroupLookup for MemoryStore {
    async fn base_group(&self) -> Result<Group> {
        self.read()?
            .groups
            .get(&BASE_GROUP_ID)
            .cloned()
            .ok_or_else(|| Error::NotFound("base group".into()))
    }

    async fn user_groups(&self, user_id: UserId) -> Result<Vec<Group>> {
        let state = self.read()?;
        let ids = state
            .members
            .get(&user_id)
            .filter(|ids| !ids.is_empty())
            .ok_or_else(|| Error::NotFound(format!("groups of user {user_id}")))?;
        Ok(ids
            .iter()
            .filter_map(|id| state.groups.get(id))
            .cloned()
            .collect())
    }

    async fn user_overrides(&self, user_id: UserId) -> Result<Overrides> {
        self.read()?
            .user_overrides
            .get(&user_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("overrides of user {user_id}")))
    }

    async fn resource_overrides(
        &self,
        resource_id: ResourceId,
        group_id: GroupId,
    ) -> Result<Overrides> {
        self.read()?
            .resource_overrides
            .get(&(resource_id, group_id))
            .cloned()
            .ok_or_else(|| {
                Error::NotFound(format!("overrides of group {group_id} on resource {resource_id}"))
            })
    }
}

impl ResourceLookup for MemoryStore {
    async fn all_resources(&self) -> Result<Vec<Resource>> {
        Ok(self.read()?.resources.values().cloned().collect())
    }
}
