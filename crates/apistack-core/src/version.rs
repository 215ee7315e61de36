//! Version helpers.
//!
//! Manifests carry an explicit wire version so a provisioning backend can
//! refuse formats it does not understand. Parsing is strict.

use crate::errors::{SynthError, SynthResult};

/// Known manifest versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestVersion {
    V1,
}

impl ManifestVersion {
    /// Parse a manifest version string (e.g. "v1").
    pub fn parse(s: &str) -> SynthResult<Self> {
        match s {
            "v1" => Ok(Self::V1),
            _ => Err(SynthError::invalid_argument(format!(
                "unsupported manifest version: {s}"
            ))),
        }
    }

    /// Return the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_manifest_v1() {
        assert_eq!(ManifestVersion::parse("v1").unwrap(), ManifestVersion::V1);
    }

    #[test]
    fn parse_manifest_unknown() {
        let e = ManifestVersion::parse("v9").unwrap_err();
        assert!(format!("{e:?}").contains("unsupported manifest version"));
    }
}
