//! Policy predicates over a resolved permission vector.
//!
//! A [`Checker`] decides a single question ("may this user view records?")
//! from an already computed [`Permissions`] value. Checkers do no I/O and
//! hold no mutable state, so one checker can be evaluated any number of
//! times, from any number of tasks.
//!
//! Any `Fn(&Permissions) -> Result<bool>` is a checker; the functions here
//! build the common ones.
//!
//! # Example
//!
//! ```
//! use warden::checker::{self, Checker};
//! use warden::registry::flags;
//! use warden::Permissions;
//!
//! let perms = Permissions::builder().add_flag(flags::KICK_PLAYERS).build();
//! assert!(checker::can_moderate_players().check(&perms).unwrap());
//! assert!(!checker::require_admin().check(&perms).unwrap());
//! ```

use crate::error::Result;
use crate::permissions::Permissions;
use crate::registry::flags;

/// A pure predicate over a permission vector.
pub trait Checker: Send + Sync {
    fn check(&self, perms: &Permissions) -> Result<bool>;
}

impl<F> Checker for F
where
    F: Fn(&Permissions) -> Result<bool> + Send + Sync,
{
    fn check(&self, perms: &Permissions) -> Result<bool> {
        self(perms)
    }
}

/// Type-erased checker, for storing mixed checkers together.
pub type BoxChecker = Box<dyn Checker>;

/// Flags that bypass single-flag checks when `allow_for_admin` is set.
const ADMIN_FLAGS: &[usize] = &[flags::ADMINISTRATOR];

fn is_admin(perms: &Permissions) -> bool {
    ADMIN_FLAGS.iter().any(|&bit| perms.check_flag(bit))
}

/// Always passes.
pub fn allow_all() -> impl Checker + Clone {
    |_: &Permissions| -> Result<bool> { Ok(true) }
}

/// Never passes.
pub fn deny_all() -> impl Checker + Clone {
    |_: &Permissions| -> Result<bool> { Ok(false) }
}

/// Passes iff the administrator bit is set, whatever else is set.
pub fn require_admin() -> impl Checker + Clone {
    |perms: &Permissions| -> Result<bool> { Ok(is_admin(perms)) }
}

/// Passes if `flag` is set, or if `allow_for_admin` and the user is an
/// administrator.
pub fn has_permission(flag: usize, allow_for_admin: bool) -> impl Checker + Clone {
    move |perms: &Permissions| -> Result<bool> {
        Ok(perms.check_flag(flag) || (allow_for_admin && is_admin(perms)))
    }
}

/// Passes if any of `wanted` is set, or if `allow_for_admin` and the user is
/// an administrator. An empty list only passes through the admin override.
pub fn has_one_of_permissions(
    allow_for_admin: bool,
    wanted: &[usize],
) -> impl Checker + Clone + use<> {
    let wanted = wanted.to_vec();
    move |perms: &Permissions| -> Result<bool> {
        if allow_for_admin && is_admin(perms) {
            return Ok(true);
        }
        Ok(wanted.iter().any(|&bit| perms.check_flag(bit)))
    }
}

/// Passes if every checker passes. Stops at the first failure or error.
pub fn all_of(checkers: Vec<BoxChecker>) -> impl Checker {
    move |perms: &Permissions| -> Result<bool> {
        for checker in &checkers {
            if !checker.check(perms)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Passes if any checker passes. Stops at the first success or error.
pub fn any_of(checkers: Vec<BoxChecker>) -> impl Checker {
    move |perms: &Permissions| -> Result<bool> {
        for checker in &checkers {
            if checker.check(perms)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

pub fn can_view_server() -> impl Checker + Clone {
    has_permission(flags::VIEW_SERVERS, true)
}

pub fn can_view_records() -> impl Checker + Clone {
    has_permission(flags::VIEW_RECORDS, true)
}

pub fn can_manage_records() -> impl Checker + Clone {
    has_one_of_permissions(
        true,
        &[flags::CREATE_RECORDS, flags::EDIT_RECORDS, flags::DELETE_RECORDS],
    )
}

pub fn can_moderate_players() -> impl Checker + Clone {
    has_one_of_permissions(true, &[flags::KICK_PLAYERS, flags::BAN_PLAYERS])
}

pub fn can_execute_commands() -> impl Checker + Clone {
    has_permission(flags::EXECUTE_COMMANDS, true)
}

pub fn can_manage_groups() -> impl Checker + Clone {
    has_permission(flags::MANAGE_GROUPS, true)
}
