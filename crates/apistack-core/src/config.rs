//! Configuration structures for apistack-core.
//!
//! This module defines explicit, serializable configuration objects used by
//! the synthesizer and by higher-level components (the local gateway) to
//! toggle optional resources, throttle policy, limits and manifest hashing.
//!
//! The core crate itself does not read environment variables. All configuration
//! must be provided explicitly by the caller to preserve determinism.

use serde::{Deserialize, Serialize};

use crate::errors::{SynthError, SynthResult};

/// Stack-level configuration passed to the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StackConfig {
    /// Emit validation models and validators for methods with a body schema.
    pub enable_validation: bool,
    /// Emit documentation parts for documented methods.
    pub enable_documentation: bool,
    /// Emit the API key and usage plan.
    pub enable_usage_plan: bool,
    pub throttle: ThrottlePolicy,
    pub limits: LimitsConfig,
    pub digest: HashAlgorithm,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            enable_validation: true,
            enable_documentation: true,
            enable_usage_plan: true,
            throttle: ThrottlePolicy::default(),
            limits: LimitsConfig::default(),
            digest: HashAlgorithm::Sha256,
        }
    }
}

/// Throttle policy applied by the access binder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThrottlePolicy {
    /// `burstLimit` may not exceed `rateLimit * factor`. `None` disables the check.
    pub burst_ceiling_factor: Option<u32>,
    /// What to do when a per-method throttle exceeds the plan default.
    pub method_ceiling: MethodCeiling,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            burst_ceiling_factor: Some(10),
            method_ceiling: MethodCeiling::Reject,
        }
    }
}

/// Handling of per-method throttles that exceed the plan default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodCeiling {
    Reject,
    Warn,
    Allow,
}

impl MethodCeiling {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reject => "reject",
            Self::Warn => "warn",
            Self::Allow => "allow",
        }
    }
}

/// Resource and complexity limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LimitsConfig {
    pub max_resources: usize,
    pub max_methods: usize,
    pub max_path_depth: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            // CloudFormation caps a stack at 500 resources.
            max_resources: 500,
            max_methods: 300,
            max_path_depth: 32,
        }
    }
}

/// Supported manifest digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Sha256,
    Blake3,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    pub fn parse(s: &str) -> SynthResult<Self> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            _ => Err(SynthError::invalid_argument(format!(
                "unsupported digest algorithm: {s}"
            ))),
        }
    }
}

/// Validate a full configuration object.
pub fn validate_config(cfg: &StackConfig) -> SynthResult<()> {
    if cfg.throttle.burst_ceiling_factor == Some(0) {
        return Err(SynthError::invalid_argument(
            "burst_ceiling_factor must be greater than zero when set",
        ));
    }

    if cfg.limits.max_resources == 0 {
        return Err(SynthError::invalid_argument(
            "max_resources must be greater than zero",
        ));
    }

    if cfg.limits.max_methods == 0 {
        return Err(SynthError::invalid_argument(
            "max_methods must be greater than zero",
        ));
    }

    if cfg.limits.max_path_depth == 0 {
        return Err(SynthError::invalid_argument(
            "max_path_depth must be greater than zero",
        ));
    }

    #[cfg(not(feature = "sha256"))]
    if cfg.digest == HashAlgorithm::Sha256 {
        return Err(SynthError::invalid_argument(
            "sha256 digests require the `sha256` feature",
        ));
    }

    #[cfg(not(feature = "blake3"))]
    if cfg.digest == HashAlgorithm::Blake3 {
        return Err(SynthError::invalid_argument(
            "blake3 digests require the `blake3` feature",
        ));
    }

    Ok(())
}
