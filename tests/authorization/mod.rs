mod fanout;
mod layering;
mod store;

use warden::Permissions;

/// Permission vector with exactly `bits` set.
pub fn bits(bits: &[usize]) -> Permissions {
    Permissions::builder().add_flags(bits.iter().copied()).build()
}
