//! API key and usage plan binding.
//!
//! The binder creates exactly one `ApiKey` node and one `UsagePlan` node for a
//! stage. The plan's single stage binding carries one throttle entry per
//! supplied method override. `ensure_methods_bound` is the synthesis-time
//! guard that every key-protected method is covered by some plan.

use std::collections::BTreeMap;

use crate::config::{MethodCeiling, ThrottlePolicy};
use crate::errors::{SynthError, SynthResult};
use crate::model::{ids, ResourceKind, ResourceNode, StageBinding, ThrottleSettings, UsagePlan};

/// A per-method throttle override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodThrottle {
    pub method_id: String,
    pub throttle: ThrottleSettings,
}

/// Output of [`AccessControlBinder::bind`].
#[derive(Debug, Clone)]
pub struct AccessBinding {
    pub api_key: ResourceNode,
    pub usage_plan: ResourceNode,
    pub plan: UsagePlan,
    /// Non-fatal findings (method throttles above the plan default under `Warn`).
    pub warnings: Vec<String>,
}

/// Binds keys and plans for one gateway.
#[derive(Debug, Clone)]
pub struct AccessControlBinder {
    gateway_id: String,
    policy: ThrottlePolicy,
}

impl AccessControlBinder {
    pub fn new(gateway_id: impl Into<String>, policy: ThrottlePolicy) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            policy,
        }
    }

    /// Create the key and the plan and bind the plan to `stage_id`.
    pub fn bind(
        &self,
        stage_id: &str,
        key_name: &str,
        plan_name: &str,
        default_throttle: ThrottleSettings,
        overrides: &[MethodThrottle],
    ) -> SynthResult<AccessBinding> {
        if key_name.trim().is_empty() {
            return Err(SynthError::invalid_argument("api key name must not be empty"));
        }
        if plan_name.trim().is_empty() {
            return Err(SynthError::invalid_argument("usage plan name must not be empty"));
        }

        default_throttle.validate(
            &format!("usage plan {plan_name}"),
            self.policy.burst_ceiling_factor,
        )?;

        let mut warnings = Vec::new();
        let mut per_method: BTreeMap<String, ThrottleSettings> = BTreeMap::new();
        for o in overrides {
            let scope = format!("method {}", o.method_id);
            o.throttle.validate(&scope, self.policy.burst_ceiling_factor)?;

            if o.throttle.exceeds(&default_throttle) {
                let reason = format!(
                    "throttle {}/{} exceeds plan default {}/{}",
                    o.throttle.rate_limit,
                    o.throttle.burst_limit,
                    default_throttle.rate_limit,
                    default_throttle.burst_limit
                );
                match self.policy.method_ceiling {
                    MethodCeiling::Reject => {
                        return Err(SynthError::InvalidThrottle { scope, reason });
                    }
                    MethodCeiling::Warn => warnings.push(format!("{scope}: {reason}")),
                    MethodCeiling::Allow => {}
                }
            }

            if per_method.insert(o.method_id.clone(), o.throttle).is_some() {
                return Err(SynthError::invalid_argument(format!(
                    "duplicate throttle override for {}",
                    o.method_id
                )));
            }
        }

        let key_id = ids::api_key(&self.gateway_id, key_name);
        let plan_id = ids::usage_plan(&self.gateway_id, plan_name);

        let api_key = ResourceNode::new(key_id.clone(), ResourceKind::ApiKey)
            .with_property("name", key_name)
            .with_property("enabled", true)
            .with_property("stageRef", stage_id)
            .depends_on(stage_id);

        let plan = UsagePlan {
            name: plan_name.to_string(),
            key_ref: key_id.clone(),
            default_throttle,
            stage_bindings: vec![StageBinding {
                stage_ref: stage_id.to_string(),
                per_method_throttle: per_method,
            }],
        };

        let mut usage_plan = ResourceNode::new(plan_id, ResourceKind::UsagePlan)
            .with_property("restApiRef", self.gateway_id.clone())
            .depends_on(key_id)
            .depends_on(stage_id);
        let plan_value = serde_json::to_value(&plan)?;
        if let serde_json::Value::Object(fields) = plan_value {
            for (k, v) in fields {
                usage_plan.set_property(k, v);
            }
        }
        for method_id in plan.stage_bindings.iter().flat_map(|b| b.per_method_throttle.keys()) {
            usage_plan.add_dependency(method_id.clone());
        }

        tracing::debug!(
            plan = %usage_plan.id,
            key = %api_key.id,
            methods = overrides.len(),
            "bound usage plan to stage"
        );

        Ok(AccessBinding {
            api_key,
            usage_plan,
            plan,
            warnings,
        })
    }
}

/// Fail with `UnboundMethod` for the first key-protected method no plan covers.
///
/// `methods` yields `(method id, requires api key)` in declaration order.
pub fn ensure_methods_bound<'a, I>(methods: I, plans: &[UsagePlan]) -> SynthResult<()>
where
    I: IntoIterator<Item = (&'a str, bool)>,
{
    for (method_id, requires_key) in methods {
        if requires_key && !plans.iter().any(|p| p.covers(method_id)) {
            return Err(SynthError::UnboundMethod {
                method: method_id.to_string(),
            });
        }
    }
    Ok(())
}
