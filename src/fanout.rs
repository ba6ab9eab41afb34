//! Which resources can a user access?
//!
//! Runs the resolver once per active resource and keeps the ones the checker
//! accepts. A failure on one resource is logged and skipped; it never hides
//! the user's access to the others.

use futures_util::future;
use futures_util::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::checker::Checker;
use crate::error::{Error, Result};
use crate::lookup::{GroupLookup, ResourceLookup};
use crate::model::{AuthScope, Resource, ResourceId, UserId};
use crate::resolver::Resolver;

impl<G: GroupLookup> Resolver<'_, G> {
    /// Ids of every active resource at which `checker` passes for `user_id`.
    ///
    /// Resources are resolved up to the configured concurrency at a time, so
    /// the result is in no particular order. Returns [`Error::NotFound`] when
    /// no resource qualifies.
    pub async fn authorized_resources<R, C>(
        &self,
        resources: &R,
        user_id: UserId,
        checker: &C,
    ) -> Result<Vec<ResourceId>>
    where
        R: ResourceLookup,
        C: Checker + ?Sized,
    {
        let all = resources
            .all_resources()
            .await
            .map_err(|e| e.at("get resources"))?;
        let active: Vec<Resource> = all.into_iter().filter(|r| !r.deactivated).collect();
        let scanned = active.len();

        let authorized: Vec<ResourceId> = stream::iter(active)
            .map(|resource| self.authorize_one(resource.id, user_id, checker))
            .buffer_unordered(self.concurrency)
            .filter_map(future::ready)
            .collect()
            .await;

        debug!(user_id, scanned, authorized = authorized.len(), "Resolved resource access");

        if authorized.is_empty() {
            return Err(Error::NotFound(format!(
                "authorized resources for user {user_id}"
            )));
        }
        Ok(authorized)
    }

    async fn authorize_one<C: Checker + ?Sized>(
        &self,
        resource_id: ResourceId,
        user_id: UserId,
        checker: &C,
    ) -> Option<ResourceId> {
        let perms = match self
            .compute_permissions(AuthScope::Resource(resource_id), user_id)
            .await
        {
            Ok(perms) => perms,
            Err(e) => {
                warn!(
                    user_id,
                    resource_id,
                    error = %e,
                    "Skipping resource: permission computation failed"
                );
                return None;
            }
        };

        match checker.check(&perms) {
            Ok(true) => Some(resource_id),
            Ok(false) => None,
            Err(e) => {
                warn!(user_id, resource_id, error = %e, "Skipping resource: checker failed");
                None
            }
        }
    }
}
