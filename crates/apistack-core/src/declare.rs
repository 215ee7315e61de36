//! Stack declarations: the synthesizer's input.
//!
//! A `StackDeclaration` is plain data, usually read from JSON. Field names are
//! camelCase on the wire.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{SynthError, SynthResult};
use crate::model::schema::content_body_schema;
use crate::model::{HttpVerb, ThrottleSettings};
use crate::validation::{ModelDeclaration, ValidatorOptions, DEFAULT_CONTENT_TYPE};

/// Execution environment of the compute function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuntimeKind {
    /// Custom runtime supplied by a layer.
    #[serde(rename = "provided")]
    Provided,
    #[serde(rename = "provided.al2")]
    ProvidedAl2,
    #[serde(rename = "provided.al2023")]
    ProvidedAl2023,
}

impl RuntimeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeKind::Provided => "provided",
            RuntimeKind::ProvidedAl2 => "provided.al2",
            RuntimeKind::ProvidedAl2023 => "provided.al2023",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TracingMode {
    Active,
    #[default]
    PassThrough,
}

impl TracingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TracingMode::Active => "Active",
            TracingMode::PassThrough => "PassThrough",
        }
    }
}

/// A code layer the function runs on top of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerDeclaration {
    pub logical_id: String,
    pub layer_name: String,
    /// Opaque code location.
    pub code_asset: String,
    #[serde(default)]
    pub license: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeDeclaration {
    pub logical_id: String,
    pub function_name: String,
    pub runtime: RuntimeKind,
    pub handler: String,
    pub code_asset: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u32,
    #[serde(default = "default_memory_mb")]
    pub memory_mb: u32,
    #[serde(default)]
    pub tracing: TracingMode,
    /// Passed to the function unmodified.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub layers: Vec<LayerDeclaration>,
}

fn default_timeout_seconds() -> u32 {
    3
}

fn default_memory_mb() -> u32 {
    128
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayDeclaration {
    pub logical_id: String,
    pub name: String,
    /// The backend snapshots the gateway on its own when set.
    #[serde(default)]
    pub auto_deploy: bool,
    #[serde(default = "default_stage_name")]
    pub stage_name: String,
}

fn default_stage_name() -> String {
    "dev".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDeclaration {
    pub path: String,
    pub verb: HttpVerb,
    #[serde(default)]
    pub requires_api_key: bool,
    /// Name of a declared model validating the request body.
    #[serde(default)]
    pub body_schema_ref: Option<String>,
    /// Per-method throttle within the usage plan.
    #[serde(default)]
    pub throttle: Option<ThrottleSettings>,
    /// Free-form documentation properties.
    #[serde(default)]
    pub documentation: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsagePlanDeclaration {
    pub name: String,
    pub key_name: String,
    pub throttle: ThrottleSettings,
}

/// Everything needed to synthesize one stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackDeclaration {
    pub stack: String,
    pub compute: ComputeDeclaration,
    pub gateway: GatewayDeclaration,
    #[serde(default)]
    pub models: Vec<ModelDeclaration>,
    #[serde(default)]
    pub validator: ValidatorOptions,
    pub methods: Vec<MethodDeclaration>,
    #[serde(default)]
    pub usage_plan: Option<UsagePlanDeclaration>,
}

impl StackDeclaration {
    pub fn from_json_bytes(bytes: &[u8]) -> SynthResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_json_pretty(&self) -> SynthResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn model(&self, name: &str) -> Option<&ModelDeclaration> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Name-level checks that do not need the graph.
    pub fn validate(&self) -> SynthResult<()> {
        let non_empty = [
            ("stack", self.stack.as_str()),
            ("compute.logicalId", self.compute.logical_id.as_str()),
            ("compute.handler", self.compute.handler.as_str()),
            ("gateway.logicalId", self.gateway.logical_id.as_str()),
            ("gateway.stageName", self.gateway.stage_name.as_str()),
        ];
        for (field, value) in non_empty {
            if value.trim().is_empty() {
                return Err(SynthError::invalid_argument(format!("{field} must not be empty")));
            }
        }
        if self.compute.timeout_seconds == 0 || self.compute.memory_mb == 0 {
            return Err(SynthError::invalid_argument(
                "compute timeoutSeconds and memoryMb must be greater than zero",
            ));
        }

        let mut seen = std::collections::BTreeSet::new();
        for m in &self.models {
            if !seen.insert(m.name.as_str()) {
                return Err(SynthError::invalid_argument(format!("duplicate model {}", m.name)));
            }
        }

        for m in &self.methods {
            if let Some(r) = &m.body_schema_ref {
                if self.model(r).is_none() {
                    return Err(SynthError::invalid_argument(format!(
                        "{} {} references undeclared model {r}",
                        m.verb, m.path
                    )));
                }
            }
        }
        Ok(())
    }

    /// The greeting API stack: one layer-backed function behind a keyed,
    /// throttled gateway with a validated POST and a documented GET.
    pub fn demo() -> Self {
        let throttle = ThrottleSettings::new(10, 2);

        let mut environment = BTreeMap::new();
        environment.insert("DENO_UNSTABLE".to_string(), "--unstable".to_string());

        let mut docs = Map::new();
        docs.insert("status".to_string(), Value::from("successful"));
        docs.insert("code".to_string(), Value::from(200));
        docs.insert("description".to_string(), Value::from("Get method was succcessful"));

        Self {
            stack: "deno-api-stack".to_string(),
            compute: ComputeDeclaration {
                logical_id: "NameHandler".to_string(),
                function_name: "deno-api-demo".to_string(),
                runtime: RuntimeKind::Provided,
                handler: "app.handler".to_string(),
                code_asset: "asset://src/program".to_string(),
                timeout_seconds: 30,
                memory_mb: 256,
                tracing: TracingMode::Active,
                environment,
                layers: vec![LayerDeclaration {
                    logical_id: "deno-layer".to_string(),
                    layer_name: "deno-api-layer-demo".to_string(),
                    code_asset: "asset://layer".to_string(),
                    license: Some("Apache-2.0".to_string()),
                }],
            },
            gateway: GatewayDeclaration {
                logical_id: "deno-api".to_string(),
                name: "deno-api".to_string(),
                auto_deploy: true,
                stage_name: "dev".to_string(),
            },
            models: vec![ModelDeclaration {
                name: "RequestBodyValidationModel".to_string(),
                model_name: "bodyValidation".to_string(),
                content_type: DEFAULT_CONTENT_TYPE.to_string(),
                schema: content_body_schema(),
            }],
            validator: ValidatorOptions::default(),
            methods: vec![
                MethodDeclaration {
                    path: "/api".to_string(),
                    verb: HttpVerb::Post,
                    requires_api_key: true,
                    body_schema_ref: Some("RequestBodyValidationModel".to_string()),
                    throttle: Some(throttle),
                    documentation: None,
                },
                MethodDeclaration {
                    path: "/api".to_string(),
                    verb: HttpVerb::Get,
                    requires_api_key: true,
                    body_schema_ref: None,
                    throttle: Some(throttle),
                    documentation: Some(docs),
                },
            ],
            usage_plan: Some(UsagePlanDeclaration {
                name: "deno-api-usage-plan".to_string(),
                key_name: "deno-api-key".to_string(),
                throttle,
            }),
        }
    }
}
