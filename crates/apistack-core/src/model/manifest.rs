//! The provisioning manifest.
//!
//! A manifest is the only output of synthesis: every resource node in an
//! order a backend can create them in, plus any warnings. Its `digest` covers
//! the canonical JSON of `orderedResources` and is prefixed with the
//! algorithm name (`sha256:<hex>`).

use serde::{Deserialize, Serialize};

use crate::config::HashAlgorithm;
use crate::determinism::canonical_json;
use crate::determinism::hashing::hash_canonical_hex;
use crate::domain;
use crate::errors::{SynthError, SynthResult};
use crate::version::ManifestVersion;

use super::{ResourceKind, ResourceNode};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    pub stack: String,
    pub ordered_resources: Vec<ResourceNode>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub digest: String,
}

impl Manifest {
    /// Assemble a manifest and compute its digest.
    pub fn new(
        stack: impl Into<String>,
        ordered_resources: Vec<ResourceNode>,
        warnings: Vec<String>,
        alg: HashAlgorithm,
    ) -> SynthResult<Self> {
        let digest = compute_digest(alg, &ordered_resources)?;
        Ok(Self {
            version: ManifestVersion::V1.as_str().to_string(),
            stack: stack.into(),
            ordered_resources,
            errors: Vec::new(),
            warnings,
            digest,
        })
    }

    /// Parse, check the version and verify the digest.
    pub fn from_json_bytes(bytes: &[u8]) -> SynthResult<Self> {
        let m: Manifest = serde_json::from_slice(bytes)?;
        ManifestVersion::parse(&m.version)?;
        if !m.errors.is_empty() {
            return Err(SynthError::invalid_argument(format!(
                "manifest carries {} error(s)",
                m.errors.len()
            )));
        }
        m.verify_digest()?;
        Ok(m)
    }

    /// Canonical compact JSON bytes. Identical declarations give identical bytes.
    pub fn to_canonical_bytes(&self) -> SynthResult<Vec<u8>> {
        let v = serde_json::to_value(self)?;
        canonical_json::to_canonical_bytes(&v)
    }

    pub fn to_json_pretty(&self) -> SynthResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn verify_digest(&self) -> SynthResult<()> {
        let (alg, _) = self
            .digest
            .split_once(':')
            .ok_or_else(|| SynthError::invalid_argument(format!("malformed digest: {}", self.digest)))?;
        let expected = compute_digest(HashAlgorithm::parse(alg)?, &self.ordered_resources)?;
        if expected != self.digest {
            return Err(SynthError::invariant(format!(
                "manifest digest mismatch: expected {expected}, found {}",
                self.digest
            )));
        }
        Ok(())
    }

    pub fn resource(&self, id: &str) -> Option<&ResourceNode> {
        self.ordered_resources.iter().find(|n| n.id == id)
    }

    /// Position of `id` in provisioning order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.ordered_resources.iter().position(|n| n.id == id)
    }

    pub fn resources_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceNode> {
        self.ordered_resources.iter().filter(move |n| n.kind == kind)
    }

    pub fn count_of_kind(&self, kind: ResourceKind) -> usize {
        self.resources_of_kind(kind).count()
    }
}

fn compute_digest(alg: HashAlgorithm, resources: &[ResourceNode]) -> SynthResult<String> {
    let hex = hash_canonical_hex(alg, domain::MANIFEST, &resources)?;
    Ok(format!("{}:{hex}", alg.as_str()))
}
