//! Collaborator traits the resolver reads through.
//!
//! Storage backends implement these. Every lookup reports an absent row as
//! [`Error::NotFound`](crate::Error::NotFound); any other error is treated as
//! an upstream failure by the resolver.

use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::model::{Group, GroupId, Overrides, Resource, ResourceId, UserId};

/// Source of groups and overrides.
pub trait GroupLookup: Send + Sync {
    /// The base group, which must exist.
    fn base_group(&self) -> impl Future<Output = Result<Group>> + Send;

    /// Groups the user is an explicit member of.
    fn user_groups(&self, user_id: UserId) -> impl Future<Output = Result<Vec<Group>>> + Send;

    /// User-level overrides.
    fn user_overrides(&self, user_id: UserId) -> impl Future<Output = Result<Overrides>> + Send;

    /// A group's overrides on one resource.
    fn resource_overrides(
        &self,
        resource_id: ResourceId,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Overrides>> + Send;
}

/// Source of managed resources.
pub trait ResourceLookup: Send + Sync {
    /// Every resource, deactivated ones included.
    fn all_resources(&self) -> impl Future<Output = Result<Vec<Resource>>> + Send;
}

impl<T: GroupLookup> GroupLookup for &T {
    fn base_group(&self) -> impl Future<Output = Result<Group>> + Send {
        (**self).base_group()
    }

    fn user_groups(&self, user_id: UserId) -> impl Future<Output = Result<Vec<Group>>> + Send {
        (**self).user_groups(user_id)
    }

    fn user_overrides(&self, user_id: UserId) -> impl Future<Output = Result<Overrides>> + Send {
        (**self).user_overrides(user_id)
    }

    fn resource_overrides(
        &self,
        resource_id: ResourceId,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Overrides>> + Send {
        (**self).resource_overrides(resource_id, group_id)
    }
}

impl<T: GroupLookup> GroupLookup for Arc<T> {
    fn base_group(&self) -> impl Future<Output = Result<Group>> + Send {
        (**self).base_group()
    }

    fn user_groups(&self, user_id: UserId) -> impl Future<Output = Result<Vec<Group>>> + Send {
        (**self).user_groups(user_id)
    }

    fn user_overrides(&self, user_id: UserId) -> impl Future<Output = Result<Overrides>> + Send {
        (**self).user_overrides(user_id)
    }

    fn resource_overrides(
        &self,
        resource_id: ResourceId,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Overrides>> + Send {
        (**self).resource_overrides(resource_id, group_id)
    }
}

impl<T: ResourceLookup> ResourceLookup for &T {
    fn all_resources(&self) -> impl Future<Output = Result<Vec<Resource>>> + Send {
        (**self).all_resources()
    }
}

impl<T: ResourceLookup> ResourceLookup for Arc<T> {
    fn all_resources(&self) -> impl Future<Output = Result<Vec<Resource>>> + Send {
        (**self).all_resources()
    }
}
