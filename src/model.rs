//! Groups, overrides, resources and authorization scopes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::permissions::Permissions;

pub type UserId = i64;
pub type GroupId = i64;
pub type ResourceId = i64;

/// Id of the base ("everyone") group.
///
/// The base group is an ordinary [`Group`] that sits at this id by
/// convention. It applies to every user without a membership row, and is
/// otherwise treated like any other group: if a user is also an explicit
/// member, it takes part in the group union and resource overrides like the
/// rest.
pub const BASE_GROUP_ID: GroupId = 1;

/// A named permission grant shared by its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    /// Base-10 permission string, as stored.
    pub permissions: String,
    /// Display ordering; lower sorts first.
    pub position: i64,
    pub created_at: jiff::Timestamp,
    pub updated_at: jiff::Timestamp,
}

impl Group {
    /// A group at position 0, created now.
    pub fn new(id: GroupId, name: impl Into<String>, permissions: &Permissions) -> Self {
        let now = jiff::Timestamp::now();
        Self {
            id,
            name: name.into(),
            permissions: permissions.to_string(),
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_base(&self) -> bool {
        self.id == BASE_GROUP_ID
    }
}

/// A deny/allow delta applied at one resolution layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    /// Group the override belongs to; `None` for user-level overrides.
    pub group_id: Option<GroupId>,
    /// Bits forced on, as a base-10 string.
    pub allow: String,
    /// Bits forced off, as a base-10 string.
    pub deny: String,
}

/// A managed resource (a game server).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub deactivated: bool,
}

/// What a permission computation is anchored to.
///
/// Text form is `global` or `resource:<id>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthScope {
    Global,
    Resource(ResourceId),
}

impl fmt::Display for AuthScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthScope::Global => f.write_str("global"),
            AuthScope::Resource(id) => write!(f, "resource:{id}"),
        }
    }
}

impl FromStr for AuthScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if s == "global" {
            return Ok(AuthScope::Global);
        }
        s.strip_prefix("resource:")
            .and_then(|id| id.parse().ok())
            .map(AuthScope::Resource)
            .ok_or_else(|| Error::InvalidScope(s.to_string()))
    }
}
