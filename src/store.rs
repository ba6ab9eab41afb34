//! libsql-backed group and resource storage.
//!
//! [`Store`] answers the resolver's lookups and carries the administrative
//! writes that feed them. Writes take [`Permissions`] values rather than raw
//! strings, so nothing unparsable ever reaches a permission column.

use std::sync::Arc;

use libsql::{Connection, Database, Row, params};

use crate::db;
use crate::error::{Error, Result};
use crate::lookup::{GroupLookup, ResourceLookup};
use crate::model::{BASE_GROUP_ID, Group, GroupId, Overrides, Resource, ResourceId, UserId};
use crate::permissions::Permissions;
use crate::registry::Registry;

const GROUP_COLUMNS: &str = "id, name, permissions, position, created_at, updated_at";

/// Name given to the base group when it is provisioned.
pub const BASE_GROUP_NAME: &str = "everyone";

/// Database handle for permission data.
#[derive(Clone)]
pub struct Store {
    // Kept alive alongside the connection; an in-memory database lives as
    // long as this handle.
    _db: Arc<Database>,
    conn: Connection,
}

fn now() -> String {
    jiff::Timestamp::now().to_string()
}

fn timestamp(raw: String) -> Result<jiff::Timestamp> {
    raw.parse()
        .map_err(|e| Error::Upstream(format!("Invalid stored timestamp {raw:?}: {e}")))
}

fn group_from_row(row: &Row) -> Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        name: row.get(1)?,
        permissions: row.get(2)?,
        position: row.get(3)?,
        created_at: timestamp(row.get(4)?)?,
        updated_at: timestamp(row.get(5)?)?,
    })
}

fn overrides_from_row(row: &Row, group_id: Option<GroupId>) -> Result<Overrides> {
    Ok(Overrides {
        group_id,
        allow: row.get(0)?,
        deny: row.get(1)?,
    })
}

fn resource_from_row(row: &Row) -> Result<Resource> {
    Ok(Resource {
        id: row.get(0)?,
        name: row.get(1)?,
        deactivated: row.get::<i64>(2)? != 0,
    })
}

impl Store {
    /// Connect to `url`, migrate the schema and return a ready store.
    pub async fn open(url: &str) -> Result<Self> {
        let database = db::connect(url).await?;
        let conn = db::connection(&database)?;
        db::migrate(&conn).await?;
        tracing::info!(url, "Permission store opened");
        Ok(Self {
            _db: Arc::new(database),
            conn,
        })
    }

    pub async fn group(&self, group_id: GroupId) -> Result<Group> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = ?1");
        let mut rows = self.conn.query(&sql, params![group_id]).await?;
        match rows.next().await? {
            Some(row) => group_from_row(&row),
            None => Err(Error::NotFound(format!("group {group_id}"))),
        }
    }

    /// Create the base group with the registry's default permissions.
    ///
    /// Does nothing if the base group already exists. Returns the stored
    /// base group either way.
    pub async fn provision_base_group(&self, registry: &Registry) -> Result<Group> {
        let created_at = now();
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO groups (id, name, permissions, position, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, 0, ?4, ?4)",
                params![
                    BASE_GROUP_ID,
                    BASE_GROUP_NAME,
                    registry.default_permissions().to_string(),
                    created_at
                ],
            )
            .await?;
        if inserted > 0 {
            tracing::info!(group_id = BASE_GROUP_ID, "Provisioned base group");
        }
        self.group(BASE_GROUP_ID).await
    }

    /// Create a group. Ids are allocated above the reserved base group id.
    pub async fn create_group(
        &self,
        name: &str,
        permissions: &Permissions,
        position: i64,
    ) -> Result<Group> {
        let created_at = now();
        self.conn
            .execute(
                "INSERT INTO groups (id, name, permissions, position, created_at, updated_at) \
                 VALUES ((SELECT max(coalesce(max(id), 0), ?1) + 1 FROM groups), ?2, ?3, ?4, ?5, ?5)",
                params![BASE_GROUP_ID, name, permissions.to_string(), position, created_at],
            )
            .await?;
        let id = self.conn.last_insert_rowid();
        tracing::debug!(group_id = id, name, "Created group");
        self.group(id).await
    }

    pub async fn set_group_permissions(
        &self,
        group_id: GroupId,
        permissions: &Permissions,
    ) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE groups SET permissions = ?2, updated_at = ?3 WHERE id = ?1",
                params![group_id, permissions.to_string(), now()],
            )
            .await?;
        if changed == 0 {
            return Err(Error::NotFound(format!("group {group_id}")));
        }
        Ok(())
    }

    /// Add `user_id` to an existing group. Adding twice is a no-op.
    pub async fn add_user_to_group(&self, user_id: UserId, group_id: GroupId) -> Result<()> {
        self.group(group_id).await?;
        self.conn
            .execute(
                "INSERT OR IGNORE INTO group_members (user_id, group_id) VALUES (?1, ?2)",
                params![user_id, group_id],
            )
            .await?;
        Ok(())
    }

    /// Returns whether a membership was removed.
    pub async fn remove_user_from_group(&self, user_id: UserId, group_id: GroupId) -> Result<bool> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM group_members WHERE user_id = ?1 AND group_id = ?2",
                params![user_id, group_id],
            )
            .await?;
        Ok(removed > 0)
    }

    pub async fn set_user_overrides(
        &self,
        user_id: UserId,
        allow: &Permissions,
        deny: &Permissions,
    ) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO user_overrides (user_id, allow_bits, deny_bits) VALUES (?1, ?2, ?3) \
                 ON CONFLICT(user_id) DO UPDATE SET allow_bits = excluded.allow_bits, deny_bits = excluded.deny_bits",
                params![user_id, allow.to_string(), deny.to_string()],
            )
            .await?;
        Ok(())
    }

    pub async fn set_resource_overrides(
        &self,
        resource_id: ResourceId,
        group_id: GroupId,
        allow: &Permissions,
        deny: &Permissions,
    ) -> Result<()> {
        self.group(group_id).await?;
        self.resource(resource_id).await?;
        self.conn
            .execute(
                "INSERT INTO resource_overrides (resource_id, group_id, allow_bits, deny_bits) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(resource_id, group_id) DO UPDATE SET allow_bits = excluded.allow_bits, deny_bits = excluded.deny_bits",
                params![resource_id, group_id, allow.to_string(), deny.to_string()],
            )
            .await?;
        Ok(())
    }

    pub async fn resource(&self, resource_id: ResourceId) -> Result<Resource> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, name, deactivated FROM resources WHERE id = ?1",
                params![resource_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => resource_from_row(&row),
            None => Err(Error::NotFound(format!("resource {resource_id}"))),
        }
    }

    pub async fn create_resource(&self, name: &str) -> Result<Resource> {
        self.conn
            .execute("INSERT INTO resources (name) VALUES (?1)", params![name])
            .await?;
        Ok(Resource {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            deactivated: false,
        })
    }

    pub async fn set_resource_deactivated(
        &self,
        resource_id: ResourceId,
        deactivated: bool,
    ) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE resources SET deactivated = ?2 WHERE id = ?1",
                params![resource_id, i64::from(deactivated)],
            )
            .await?;
        if changed == 0 {
            return Err(Error::NotFound(format!("resource {resource_id}")));
        }
        Ok(())
    }
}

impl GroupLookup for Store {
    async fn base_group(&self) -> Result<Group> {
        self.group(BASE_GROUP_ID).await
    }

    async fn user_groups(&self, user_id: UserId) -> Result<Vec<Group>> {
        let mut rows = self
            .conn
            .query(
                "SELECT g.id, g.name, g.permissions, g.position, g.created_at, g.updated_at \
                 FROM groups g JOIN group_members m ON m.group_id = g.id \
                 WHERE m.user_id = ?1 ORDER BY g.position, g.id",
                params![user_id],
            )
            .await?;
        let mut groups = Vec::new();
        while let Some(row) = rows.next().await? {
            groups.push(group_from_row(&row)?);
        }
        Ok(groups)
    }

    async fn user_overrides(&self, user_id: UserId) -> Result<Overrides> {
        let mut rows = self
            .conn
            .query(
                "SELECT allow_bits, deny_bits FROM user_overrides WHERE user_id = ?1",
                params![user_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => overrides_from_row(&row, None),
            None => Err(Error::NotFound(format!("overrides of user {user_id}"))),
        }
    }

    async fn resource_overrides(
        &self,
        resource_id: ResourceId,
        group_id: GroupId,
    ) -> Result<Overrides> {
        let mut rows = self
            .conn
            .query(
                "SELECT allow_bits, deny_bits FROM resource_overrides WHERE resource_id = ?1 AND group_id = ?2",
                params![resource_id, group_id],
            )
            .await?;
        match rows.next().await? {
            Some(row) => overrides_from_row(&row, Some(group_id)),
            None => Err(Error::NotFound(format!(
                "overrides of group {group_id} on resource {resource_id}"
            ))),
        }
    }
}

impl ResourceLookup for Store {
    async fn all_resources(&self) -> Result<Vec<Resource>> {
        let mut rows = self
            .conn
            .query("SELECT id, name, deactivated FROM resources ORDER BY id", ())
            .await?;
        let mut resources = Vec::new();
        while let Some(row) = rows.next().await? {
            resources.push(resource_from_row(&row)?);
        }
        Ok(resources)
    }
}
