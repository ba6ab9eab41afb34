//! Database connection and schema.
//!
//! Supports multiple backends:
//! - Local SQLite file: `path/to/db.sqlite` or `file:path` or `sqlite://path`
//! - In-memory: `:memory:`
//! - Remote Turso: `libsql://...` or `https://...` (requires TURSO_AUTH_TOKEN env var)
//!
//! Permission columns are TEXT holding the base-10 form of a
//! [`Permissions`](crate::Permissions) value. Integer columns would cap the
//! number of flags at 63.

use libsql::{Builder, Connection, Database};

/// Connect to the database.
///
/// # URL formats
/// - Local file: `mydata.db`, `file:path/to/db.sqlite`, `sqlite://path`
/// - In-memory: `:memory:`
/// - Remote Turso: `libsql://your-db.turso.io` (requires `TURSO_AUTH_TOKEN` env var)
pub async fn connect(url: &str) -> crate::Result<Database> {
    let db = if url.starts_with("libsql://") || url.starts_with("https://") {
        let token = std::env::var("TURSO_AUTH_TOKEN").map_err(|_| {
            crate::Error::Config("TURSO_AUTH_TOKEN not set for remote database".into())
        })?;
        Builder::new_remote(url.to_string(), token).build().await?
    } else if url == ":memory:" {
        Builder::new_local(":memory:").build().await?
    } else {
        let path = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("file:"))
            .unwrap_or(url);
        Builder::new_local(path).build().await?
    };

    Ok(db)
}

/// Get a connection from the database.
///
/// Every connection to a `:memory:` database sees its own empty database,
/// so hold on to one connection for the lifetime of an in-memory store.
pub fn connection(db: &Database) -> crate::Result<Connection> {
    Ok(db.connect()?)
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS groups (
    id          INTEGER PRIMARY KEY,
    name        TEXT    NOT NULL,
    permissions TEXT    NOT NULL DEFAULT '0',
    position    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS group_members (
    user_id  INTEGER NOT NULL,
    group_id INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, group_id)
);

CREATE TABLE IF NOT EXISTS user_overrides (
    user_id    INTEGER PRIMARY KEY,
    allow_bits TEXT NOT NULL DEFAULT '0',
    deny_bits  TEXT NOT NULL DEFAULT '0'
);

CREATE TABLE IF NOT EXISTS resources (
    id          INTEGER PRIMARY KEY,
    name        TEXT    NOT NULL,
    deactivated INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS resource_overrides (
    resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    group_id    INTEGER NOT NULL REFERENCES groups(id) ON DELETE CASCADE,
    allow_bits  TEXT    NOT NULL DEFAULT '0',
    deny_bits   TEXT    NOT NULL DEFAULT '0',
    PRIMARY KEY (resource_id, group_id)
);
"#;

/// Turn on foreign key enforcement for `conn` and create the schema if it
/// does not exist yet. Safe to run on every start.
///
/// SQLite keeps the foreign key setting per connection, so run this on
/// every connection that writes.
pub async fn migrate(conn: &Connection) -> crate::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", ()).await?;
    conn.execute_batch(SCHEMA).await?;
    tracing::debug!("Database schema ready");
    Ok(())
}
