//! Effective permission resolution.
//!
//! [`Resolver::compute_permissions`] folds the layers for one user into a
//! single [`Permissions`] vector, in this order:
//!
//! 1. the base group (mandatory)
//! 2. the union of the user's groups
//! 3. for resource scope only: every group's resource overrides, all denies
//!    first, then all allows
//! 4. the user's own overrides, deny then allow
//!
//! Within one override layer deny always lands before allow, so an allow
//! restores a bit that any deny in the same layer removed. Denies commute
//! with each other and allows commute with each other, so the order groups
//! come back from storage does not matter.
//!
//! A missing base group fails resolution. Missing groups or overrides
//! contribute nothing.

use tracing::{debug, trace};

use crate::checker::Checker;
use crate::error::{Error, Result};
use crate::lookup::GroupLookup;
use crate::model::{AuthScope, Group, Overrides, ResourceId, UserId};
use crate::permissions::Permissions;
use crate::registry::Registry;

/// Default number of resources resolved at once by
/// [`authorized_resources`](Resolver::authorized_resources).
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 8;

/// Computes effective permissions from a [`GroupLookup`].
///
/// Holds no mutable state; share one resolver across tasks.
pub struct Resolver<'a, G> {
    registry: &'a Registry,
    groups: G,
    pub(crate) concurrency: usize,
}

impl<'a, G: GroupLookup> Resolver<'a, G> {
    pub fn new(registry: &'a Registry, groups: G) -> Self {
        Self {
            registry,
            groups,
            concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }

    /// Set how many resources the fan-out resolves concurrently.
    /// Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Compute the effective permissions of `user_id` at `scope`.
    pub async fn compute_permissions(
        &self,
        scope: AuthScope,
        user_id: UserId,
    ) -> Result<Permissions> {
        trace!(user_id, %scope, "Computing permissions");

        let base = self
            .groups
            .base_group()
            .await
            .map_err(|e| e.at("get base group"))?;
        let mut perms: Permissions = base
            .permissions
            .parse()
            .map_err(|e: Error| e.at("parse base group permissions"))?;

        let groups = absent_as_none(self.groups.user_groups(user_id).await, "get user groups")?
            .unwrap_or_default();
        for group in &groups {
            let granted: Permissions = group
                .permissions
                .parse()
                .map_err(|e: Error| e.at("parse group permissions"))?;
            perms = perms.or(&granted);
        }

        if let AuthScope::Resource(resource_id) = scope {
            perms = self
                .apply_resource_overrides(perms, resource_id, &groups)
                .await?;
        }

        match absent_as_none(
            self.groups.user_overrides(user_id).await,
            "get user overrides",
        )? {
            Some(overrides) => {
                perms = perms
                    .compute_deny_overrides(&overrides.deny)
                    .map_err(|e| e.at("apply user deny overrides"))?
                    .compute_allow_overrides(&overrides.allow)
                    .map_err(|e| e.at("apply user allow overrides"))?;
            }
            None => trace!(user_id, "No user overrides"),
        }

        Ok(perms)
    }

    async fn apply_resource_overrides(
        &self,
        perms: Permissions,
        resource_id: ResourceId,
        groups: &[Group],
    ) -> Result<Permissions> {
        let mut found: Vec<Overrides> = Vec::with_capacity(groups.len());
        for group in groups {
            let overrides = absent_as_none(
                self.groups.resource_overrides(resource_id, group.id).await,
                "get resource overrides",
            )?;
            match overrides {
                Some(overrides) => found.push(overrides),
                None => trace!(resource_id, group_id = group.id, "No resource overrides"),
            }
        }

        // Two passes: no group's deny may land after another group's allow.
        let mut perms = perms;
        for overrides in &found {
            perms = perms
                .compute_deny_overrides(&overrides.deny)
                .map_err(|e| e.at("apply resource deny overrides"))?;
        }
        for overrides in &found {
            perms = perms
                .compute_allow_overrides(&overrides.allow)
                .map_err(|e| e.at("apply resource allow overrides"))?;
        }

        debug!(resource_id, overrides = found.len(), "Applied resource overrides");
        Ok(perms)
    }

    /// Compute permissions and evaluate `checker` against them.
    pub async fn has_permission<C: Checker + ?Sized>(
        &self,
        scope: AuthScope,
        user_id: UserId,
        checker: &C,
    ) -> Result<bool> {
        let perms = self.compute_permissions(scope, user_id).await?;
        checker.check(&perms)
    }

    /// Permissions for display at `scope`: the computed vector with flags
    /// that carry no meaning at that scope stripped.
    pub async fn visible_permissions(
        &self,
        scope: AuthScope,
        user_id: UserId,
    ) -> Result<Permissions> {
        let perms = self.compute_permissions(scope, user_id).await?;
        Ok(self.registry.filter_to_scope(&perms, &scope))
    }
}

/// Map NotFound to `None` and tag any other failure with `step`.
fn absent_as_none<T>(result: Result<T>, step: &'static str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.at(step)),
    }
}
