//! Throttle settings and usage plan records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{SynthError, SynthResult};

/// Steady-state request rate and burst capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleSettings {
    pub rate_limit: u32,
    pub burst_limit: u32,
}

impl ThrottleSettings {
    pub fn new(rate_limit: u32, burst_limit: u32) -> Self {
        Self {
            rate_limit,
            burst_limit,
        }
    }

    /// Check positivity and, when a ceiling factor is set, `burst <= rate * factor`.
    pub fn validate(&self, scope: &str, burst_ceiling_factor: Option<u32>) -> SynthResult<()> {
        if self.rate_limit == 0 {
            return Err(SynthError::InvalidThrottle {
                scope: scope.to_string(),
                reason: "rateLimit must be greater than zero".to_string(),
            });
        }
        if self.burst_limit == 0 {
            return Err(SynthError::InvalidThrottle {
                scope: scope.to_string(),
                reason: "burstLimit must be greater than zero".to_string(),
            });
        }
        if let Some(factor) = burst_ceiling_factor {
            let ceiling = u64::from(self.rate_limit) * u64::from(factor);
            if u64::from(self.burst_limit) > ceiling {
                return Err(SynthError::InvalidThrottle {
                    scope: scope.to_string(),
                    reason: format!(
                        "burstLimit {} exceeds ceiling {ceiling} (rateLimit {} x {factor})",
                        self.burst_limit, self.rate_limit
                    ),
                });
            }
        }
        Ok(())
    }

    /// True when either limit is above `other`'s.
    pub fn exceeds(&self, other: &ThrottleSettings) -> bool {
        self.rate_limit > other.rate_limit || self.burst_limit > other.burst_limit
    }
}

/// Per-stage throttle overrides of a usage plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageBinding {
    pub stage_ref: String,
    #[serde(default)]
    pub per_method_throttle: BTreeMap<String, ThrottleSettings>,
}

/// A named bundle of throttle limits gated by an API key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePlan {
    pub name: String,
    pub key_ref: String,
    pub default_throttle: ThrottleSettings,
    pub stage_bindings: Vec<StageBinding>,
}

impl UsagePlan {
    /// True when any stage binding carries a throttle entry for `method_id`.
    pub fn covers(&self, method_id: &str) -> bool {
        self.stage_bindings
            .iter()
            .any(|b| b.per_method_throttle.contains_key(method_id))
    }

    /// Effective throttle for a method on a stage: the override, else the plan default.
    pub fn throttle_for(&self, stage_ref: &str, method_id: &str) -> ThrottleSettings {
        self.stage_bindings
            .iter()
            .filter(|b| b.stage_ref == stage_ref)
            .find_map(|b| b.per_method_throttle.get(method_id).copied())
            .unwrap_or(self.default_throttle)
    }
}
