//! Determinism helpers: canonical JSON and domain-separated hashing.

pub mod canonical_json;
pub mod hashing;
