//! Permission flag registry.
//!
//! The registry maps flag names to bit positions. Positions are handed out
//! in registration order, once, at process start. Persisted permission
//! strings are only meaningful relative to that order, so the catalog passed
//! to [`Registry::register_all`] is append-only: new flags go at the end,
//! existing flags are never removed, reordered or renamed into a different
//! slot. Nothing checks this at runtime; reordering silently changes the
//! meaning of every stored value.
//!
//! # Example
//!
//! ```
//! use warden::registry::{Registry, flags};
//!
//! let registry = Registry::standard().unwrap();
//! let admin = registry.lookup("administrator").unwrap();
//! assert_eq!(admin.bit, flags::ADMINISTRATOR);
//! ```

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::AuthScope;
use crate::permissions::Permissions;

/// Where a flag carries meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagScope {
    /// Meaningful both application-wide and per resource.
    Any,
    /// Only meaningful application-wide.
    AppOnly,
    /// Only meaningful for a single resource.
    ResourceOnly,
}

impl FlagScope {
    /// Whether a flag with this scope is visible in a view anchored at `scope`.
    pub fn matches(self, scope: &AuthScope) -> bool {
        match (self, scope) {
            (FlagScope::Any, _) => true,
            (FlagScope::AppOnly, AuthScope::Global) => true,
            (FlagScope::ResourceOnly, AuthScope::Resource(_)) => true,
            _ => false,
        }
    }
}

/// A flag declaration, before it has a bit position.
#[derive(Debug, Clone, Copy)]
pub struct FlagSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub scope: FlagScope,
    /// Granted to a freshly provisioned base group.
    pub default: bool,
}

/// A registered flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionFlag {
    pub name: &'static str,
    pub bit: usize,
    pub description: &'static str,
    pub scope: FlagScope,
}

/// Read-only catalog of every known flag.
#[derive(Debug, Clone)]
pub struct Registry {
    flags: Vec<PermissionFlag>,
    by_name: HashMap<&'static str, usize>,
    defaults: Permissions,
}

impl Registry {
    /// Register `specs` in order, assigning bit 0 to the first entry, bit 1
    /// to the second, and so on.
    ///
    /// Call exactly once at startup with the full append-only catalog.
    /// Duplicate names are rejected.
    pub fn register_all(specs: &[FlagSpec]) -> Result<Self> {
        let mut flags = Vec::with_capacity(specs.len());
        let mut by_name = HashMap::with_capacity(specs.len());
        let mut defaults = Permissions::builder();

        for (bit, spec) in specs.iter().enumerate() {
            if by_name.insert(spec.name, bit).is_some() {
                return Err(Error::DuplicateFlag(spec.name.to_string()));
            }
            if spec.default {
                defaults = defaults.add_flag(bit);
            }
            flags.push(PermissionFlag {
                name: spec.name,
                bit,
                description: spec.description,
                scope: spec.scope,
            });
        }

        tracing::debug!(count = flags.len(), "Registered permission flags");

        Ok(Self {
            flags,
            by_name,
            defaults: defaults.build(),
        })
    }

    /// Registry over the platform catalog in [`flags::CATALOG`].
    pub fn standard() -> Result<Self> {
        Self::register_all(flags::CATALOG)
    }

    pub fn lookup(&self, name: &str) -> Option<&PermissionFlag> {
        self.by_name.get(name).map(|&bit| &self.flags[bit])
    }

    /// Like [`lookup`](Self::lookup), failing with [`Error::UnknownFlag`].
    pub fn require(&self, name: &str) -> Result<&PermissionFlag> {
        self.lookup(name)
            .ok_or_else(|| Error::UnknownFlag(name.to_string()))
    }

    /// Flag at a bit position, if one was registered there.
    pub fn flag(&self, bit: usize) -> Option<&PermissionFlag> {
        self.flags.get(bit)
    }

    /// All flags in registration order.
    pub fn all(&self) -> &[PermissionFlag] {
        &self.flags
    }

    /// The set granted to a newly provisioned base group.
    pub fn default_permissions(&self) -> Permissions {
        self.defaults.clone()
    }

    /// Clear every bit whose flag is not visible at `scope`.
    ///
    /// Bits with no registered flag are cleared as well. Only use this on
    /// values headed for display; checks run on the unfiltered vector.
    pub fn filter_to_scope(&self, perms: &Permissions, scope: &AuthScope) -> Permissions {
        perms
            .flags()
            .filter(|&bit| self.flag(bit).is_some_and(|f| f.scope.matches(scope)))
            .fold(Permissions::builder(), |b, bit| b.add_flag(bit))
            .build()
    }

    /// Names of the registered flags set in `perms`, in registration order.
    pub fn names(&self, perms: &Permissions) -> Vec<&'static str> {
        perms
            .flags()
            .filter_map(|bit| self.flag(bit))
            .map(|f| f.name)
            .collect()
    }

    /// Build a vector from flag names.
    pub fn from_names(&self, names: &[&str]) -> Result<Permissions> {
        names
            .iter()
            .try_fold(Permissions::builder(), |b, name| {
                Ok(b.add_flag(self.require(name)?.bit))
            })
            .map(|b| b.build())
    }
}

/// The platform's flag catalog.
///
/// Each constant is the bit position its entry in [`CATALOG`] receives.
/// Append new flags at the end of both.
pub mod flags {
    use super::{FlagScope, FlagSpec};

    pub const ADMINISTRATOR: usize = 0;
    pub const MANAGE_GROUPS: usize = 1;
    pub const MANAGE_USERS: usize = 2;
    pub const MANAGE_SERVERS: usize = 3;
    pub const VIEW_AUDIT_LOG: usize = 4;
    pub const VIEW_SERVERS: usize = 5;
    pub const MANAGE_SERVER: usize = 6;
    pub const EXECUTE_COMMANDS: usize = 7;
    pub const VIEW_CONSOLE: usize = 8;
    pub const VIEW_CHAT: usize = 9;
    pub const SEND_CHAT: usize = 10;
    pub const VIEW_PLAYERS: usize = 11;
    pub const KICK_PLAYERS: usize = 12;
    pub const BAN_PLAYERS: usize = 13;
    pub const VIEW_RECORDS: usize = 14;
    pub const CREATE_RECORDS: usize = 15;
    pub const EDIT_RECORDS: usize = 16;
    pub const DELETE_RECORDS: usize = 17;
    pub const VIEW_REPORTS: usize = 18;
    pub const MANAGE_REPORTS: usize = 19;

    const fn spec(
        name: &'static str,
        description: &'static str,
        scope: FlagScope,
        default: bool,
    ) -> FlagSpec {
        FlagSpec {
            name,
            description,
            scope,
            default,
        }
    }

    pub const CATALOG: &[FlagSpec] = &[
        spec("administrator", "Full control over the application", FlagScope::AppOnly, false),
        spec("manage_groups", "Create, edit and delete groups", FlagScope::AppOnly, false),
        spec("manage_users", "Edit users and their group memberships", FlagScope::AppOnly, false),
        spec("manage_servers", "Add and remove game servers", FlagScope::AppOnly, false),
        spec("view_audit_log", "View the application audit log", FlagScope::AppOnly, false),
        spec("view_servers", "See a game server and its status", FlagScope::Any, true),
        spec("manage_server", "Change a game server's settings", FlagScope::Any, false),
        spec("execute_commands", "Run console commands on a game server", FlagScope::Any, false),
        spec("view_console", "Watch a game server's live console", FlagScope::ResourceOnly, false),
        spec("view_chat", "Read in-game chat", FlagScope::Any, true),
        spec("send_chat", "Send in-game chat messages", FlagScope::Any, false),
        spec("view_players", "See connected players", FlagScope::Any, true),
        spec("kick_players", "Kick players from a game server", FlagScope::Any, false),
        spec("ban_players", "Ban players from a game server", FlagScope::Any, false),
        spec("view_records", "View player records", FlagScope::Any, true),
        spec("create_records", "Create player records", FlagScope::Any, false),
        spec("edit_records", "Edit player records", FlagScope::Any, false),
        spec("delete_records", "Delete player records", FlagScope::Any, false),
        spec("view_reports", "View player reports", FlagScope::Any, false),
        spec("manage_reports", "Resolve and dismiss player reports", FlagScope::Any, false),
    ];
}
