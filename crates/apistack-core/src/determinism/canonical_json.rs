//! Canonical JSON encoding.
//!
//! Default `serde_json` output is not a canonical form. Manifests are hashed
//! and diffed byte-for-byte, so everything that gets hashed or written goes
//! through this module:
//! - object keys sorted lexicographically (by UTF-8 bytes)
//! - no insignificant whitespace
//! - non-finite numbers cannot occur (serde_json rejects them)

use serde_json::{Map, Value};

use crate::errors::{SynthError, SynthResult};

/// Return a copy of `v` with every object's keys in sorted order.
pub fn canonicalize_json(v: &Value) -> Value {
    match v {
        Value::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for k in keys {
                out.insert(k.clone(), canonicalize_json(&obj[k.as_str()]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_json).collect()),
        other => other.clone(),
    }
}

/// Encode a value as canonical compact JSON bytes.
pub fn to_canonical_bytes(v: &Value) -> SynthResult<Vec<u8>> {
    serde_json::to_vec(&canonicalize_json(v))
        .map_err(|e| SynthError::serialization(format!("failed to encode canonical JSON: {e}")))
}

/// Encode a value as canonical compact JSON text.
pub fn to_canonical_string(v: &Value) -> SynthResult<String> {
    let bytes = to_canonical_bytes(v)?;
    String::from_utf8(bytes)
        .map_err(|e| SynthError::serialization(format!("canonical JSON is not UTF-8: {e}")))
}
