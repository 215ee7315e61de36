//! bcrypt credential derivation.
//!
//! Encoded form is the modular crypt string `$2b$<cost>$<salt+digest>`, so
//! keys issued here verify with any bcrypt implementation.

use bcrypt::Version;

use crate::error::{HandlerError, HandlerResult};

pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;
/// Cost used by the greeting route.
pub const DEFAULT_COST: u32 = 8;

/// Derive an encoded credential for `secret` with a fresh random salt.
pub fn derive(secret: &str, cost: u32) -> HandlerResult<String> {
    check_cost(cost)?;
    bcrypt::hash(secret, cost).map_err(|e| HandlerError::InvalidCredential(e.to_string()))
}

/// Derive with a caller-provided salt. Deterministic.
pub fn derive_with_salt(secret: &str, cost: u32, salt: [u8; 16]) -> HandlerResult<String> {
    check_cost(cost)?;
    bcrypt::hash_with_salt(secret, cost, salt)
        .map(|parts| parts.format_for_version(Version::TwoB))
        .map_err(|e| HandlerError::InvalidCredential(e.to_string()))
}

/// Check `secret` against an encoded credential.
pub fn verify(secret: &str, encoded: &str) -> HandlerResult<bool> {
    bcrypt::verify(secret, encoded).map_err(|e| HandlerError::InvalidCredential(e.to_string()))
}

fn check_cost(cost: u32) -> HandlerResult<()> {
    if !(MIN_COST..=MAX_COST).contains(&cost) {
        return Err(HandlerError::InvalidCredential(format!(
            "cost {cost} outside {MIN_COST}..={MAX_COST}"
        )));
    }
    Ok(())
}
