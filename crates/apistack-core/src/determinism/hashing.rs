//! Deterministic hashing utilities for apistack.
//!
//! All hashes are:
//! - deterministic
//! - domain-separated
//! - explicitly parameterized
//!
//! Supported algorithms:
//! - sha256 (feature `sha256`)
//! - blake3 (feature `blake3`)

use serde::Serialize;
#[cfg(feature = "sha256")]
use sha2::{Digest, Sha256};

use crate::config::HashAlgorithm;
use crate::determinism::canonical_json;
use crate::errors::{SynthError, SynthResult};

/// Hash raw bytes using the selected algorithm.
pub fn hash_bytes(alg: HashAlgorithm, bytes: &[u8]) -> SynthResult<Vec<u8>> {
    match alg {
        #[cfg(feature = "sha256")]
        HashAlgorithm::Sha256 => {
            let mut h = Sha256::new();
            h.update(bytes);
            Ok(h.finalize().to_vec())
        }
        #[cfg(not(feature = "sha256"))]
        HashAlgorithm::Sha256 => Err(SynthError::invalid_argument(
            "sha256 support is not compiled in",
        )),
        #[cfg(feature = "blake3")]
        HashAlgorithm::Blake3 => Ok(blake3::hash(bytes).as_bytes().to_vec()),
        #[cfg(not(feature = "blake3"))]
        HashAlgorithm::Blake3 => Err(SynthError::invalid_argument(
            "blake3 support is not compiled in",
        )),
    }
}

/// Hash raw bytes with a domain label prefix and return lowercase hex.
pub fn hash_with_domain_hex(alg: HashAlgorithm, domain: &str, payload: &[u8]) -> SynthResult<String> {
    let mut buf = Vec::with_capacity(domain.len() + 1 + payload.len());
    buf.extend_from_slice(domain.as_bytes());
    buf.push(0);
    buf.extend_from_slice(payload);
    Ok(hex::encode(hash_bytes(alg, &buf)?))
}

/// Hash the canonical JSON encoding of any serializable value.
pub fn hash_canonical_hex<T: Serialize>(
    alg: HashAlgorithm,
    domain: &str,
    value: &T,
) -> SynthResult<String> {
    let v = serde_json::to_value(value)
        .map_err(|e| SynthError::serialization(format!("failed to serialize value for hashing: {e}")))?;
    let bytes = canonical_json::to_canonical_bytes(&v)?;
    hash_with_domain_hex(alg, domain, &bytes)
}
