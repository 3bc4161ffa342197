//! Placeholder identifiers for entities the server has not confirmed yet.

pub const PLACEHOLDER_PREFIX: &str = "local-";

/// Generate a fresh placeholder id: `local-` + 32 hex digits of randomness.
///
/// Server ids never carry the prefix, so placeholders cannot collide with them.
#[must_use]
pub fn placeholder_id() -> String {
    format!("{PLACEHOLDER_PREFIX}{:032x}", rand::random::<u128>())
}

#[must_use]
pub fn is_placeholder(id: &str) -> bool {
    id.starts_with(PLACEHOLDER_PREFIX)
}
