//! Resource nodes: the unit of the provisioning manifest.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of infrastructure a node declares.
///
/// Variant names are the wire representation and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Gateway,
    Resource,
    Method,
    Integration,
    ValidationModel,
    Validator,
    Deployment,
    Stage,
    ApiKey,
    UsagePlan,
    ComputeFunction,
    Layer,
    DocumentationPart,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gateway => "Gateway",
            Self::Resource => "Resource",
            Self::Method => "Method",
            Self::Integration => "Integration",
            Self::ValidationModel => "ValidationModel",
            Self::Validator => "Validator",
            Self::Deployment => "Deployment",
            Self::Stage => "Stage",
            Self::ApiKey => "ApiKey",
            Self::UsagePlan => "UsagePlan",
            Self::ComputeFunction => "ComputeFunction",
            Self::Layer => "Layer",
            Self::DocumentationPart => "DocumentationPart",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, uniquely identified infrastructure declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub id: String,
    pub kind: ResourceKind,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
}

impl ResourceNode {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            properties: BTreeMap::new(),
            depends_on: BTreeSet::new(),
        }
    }

    /// Builder-style property setter.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Builder-style dependency setter.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.insert(id.into());
        self
    }

    pub fn add_dependency(&mut self, id: impl Into<String>) {
        self.depends_on.insert(id.into());
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }

    pub fn property_bool(&self, key: &str) -> Option<bool> {
        self.properties.get(key).and_then(Value::as_bool)
    }

    pub fn is_kind(&self, kind: ResourceKind) -> bool {
        self.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_serializes_with_wire_names() {
        let n = ResourceNode::new("deno-api/method/api/GET", ResourceKind::Method)
            .with_property("httpVerb", "GET")
            .depends_on("deno-api/resource/api");
        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(
            v,
            json!({
                "id": "deno-api/method/api/GET",
                "kind": "Method",
                "properties": {"httpVerb": "GET"},
                "dependsOn": ["deno-api/resource/api"]
            })
        );
    }

    #[test]
    fn missing_collections_default_on_decode() {
        let n: ResourceNode = serde_json::from_value(json!({"id": "g", "kind": "Gateway"})).unwrap();
        assert!(n.properties.is_empty());
        assert!(n.depends_on.is_empty());
        assert!(n.is_kind(ResourceKind::Gateway));
    }
}
