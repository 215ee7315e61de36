//! Route table recovered from a synthesized manifest.
//!
//! Every `Method` node becomes a route. A route carries its key requirement,
//! the compiled body validator of its request model (when it has a validator
//! reference) and the throttle its usage plan assigns on the bound stage.

use std::collections::BTreeMap;

use apistack_core::model::{HttpVerb, Manifest, ResourceKind, ResourceNode, ThrottleSettings, UsagePlan};
use apistack_core::validation::{BodyValidator, RequestValidationModel};
use apistack_core::{SynthError, SynthResult};
use serde_json::Value;

#[derive(Debug)]
pub struct Route {
    pub method_id: String,
    pub verb: HttpVerb,
    pub path: String,
    pub api_key_required: bool,
    pub validator: Option<BodyValidator>,
    pub throttle: Option<ThrottleSettings>,
}

#[derive(Debug)]
pub struct RouteTable {
    stage: String,
    routes: BTreeMap<(String, HttpVerb), Route>,
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn required_str<'n>(node: &'n ResourceNode, key: &str) -> SynthResult<&'n str> {
    node.property_str(key)
        .ok_or_else(|| SynthError::invalid_argument(format!("{} has no {key}", node.id)))
}

fn plan_from_node(node: &ResourceNode) -> SynthResult<UsagePlan> {
    let fields: serde_json::Map<String, Value> = node
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Ok(serde_json::from_value(Value::Object(fields))?)
}

fn validator_for(manifest: &Manifest, method: &ResourceNode) -> SynthResult<Option<BodyValidator>> {
    let Some(validator_id) = method.property_str("validatorRef") else {
        return Ok(None);
    };
    let checks_body = manifest
        .resource(validator_id)
        .and_then(|v| v.property_bool("validateRequestBody"))
        .unwrap_or(true);
    if !checks_body {
        return Ok(None);
    }
    let Some(Value::Object(models)) = method.property("requestModels") else {
        return Ok(None);
    };
    // One model per content type; JSON bodies are what the emulator checks.
    let Some(model_id) = models
        .get("application/json")
        .or_else(|| models.values().next())
        .and_then(Value::as_str)
    else {
        return Ok(None);
    };
    let node = manifest
        .resource(model_id)
        .ok_or_else(|| SynthError::UnknownDependency {
            from: method.id.clone(),
            to: model_id.to_string(),
        })?;
    Ok(Some(RequestValidationModel::from_node(node)?.compile()?))
}

impl RouteTable {
    pub fn from_manifest(manifest: &Manifest) -> SynthResult<Self> {
        let stage_node = manifest.resources_of_kind(ResourceKind::Stage).next();
        let stage = stage_node
            .and_then(|n| n.property_str("name"))
            .unwrap_or_default()
            .to_string();
        let stage_id = stage_node.map(|n| n.id.as_str()).unwrap_or_default();

        let plans = manifest
            .resources_of_kind(ResourceKind::UsagePlan)
            .map(plan_from_node)
            .collect::<SynthResult<Vec<_>>>()?;

        let mut routes = BTreeMap::new();
        for node in manifest.resources_of_kind(ResourceKind::Method) {
            let verb: HttpVerb = required_str(node, "httpVerb")?.parse()?;
            let path = normalize(required_str(node, "path")?);
            let api_key_required = node.property_bool("requiresApiKey").unwrap_or(false);
            let throttle = if api_key_required {
                plans.first().map(|p| p.throttle_for(stage_id, &node.id))
            } else {
                None
            };
            let route = Route {
                method_id: node.id.clone(),
                verb,
                path: path.clone(),
                api_key_required,
                validator: validator_for(manifest, node)?,
                throttle,
            };
            tracing::debug!(
                method = %route.method_id,
                verb = %verb,
                path = %route.path,
                key = api_key_required,
                validated = route.validator.is_some(),
                "route registered"
            );
            routes.insert((path, verb), route);
        }

        Ok(Self { stage, routes })
    }

    /// Exact verb first, then an `ANY` method on the same path.
    pub fn lookup(&self, path: &str, verb: HttpVerb) -> Option<&Route> {
        let path = normalize(path);
        self.routes
            .get(&(path.clone(), verb))
            .or_else(|| self.routes.get(&(path, HttpVerb::Any)))
    }

    /// Name of the stage the manifest binds, empty when it binds none.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apistack_core::config::StackConfig;
    use apistack_core::declare::StackDeclaration;
    use apistack_core::pipeline::synth::Synthesizer;
    use serde_json::json;

    fn demo_table() -> RouteTable {
        let manifest = Synthesizer::new(StackConfig::default())
            .unwrap()
            .synthesize(&StackDeclaration::demo())
            .unwrap();
        RouteTable::from_manifest(&manifest).unwrap()
    }

    #[test]
    fn demo_routes() {
        let t = demo_table();
        assert_eq!(t.len(), 2);
        assert_eq!(t.stage(), "dev");

        let post = t.lookup("/api/", HttpVerb::Post).unwrap();
        assert!(post.api_key_required);
        assert_eq!(post.throttle, Some(ThrottleSettings::new(10, 2)));
        let validator = post.validator.as_ref().unwrap();
        assert!(validator.is_valid(&json!([{"content": {"photoUrl": "u", "text": "hi", "type": "image"}}])));
        assert!(!validator.is_valid(&json!({"not": "an array"})));

        let get = t.lookup("/api", HttpVerb::Get).unwrap();
        assert!(get.validator.is_none());
        assert!(t.lookup("/api", HttpVerb::Delete).is_none());
        assert!(t.lookup("/other", HttpVerb::Get).is_none());
    }

    #[test]
    fn normalizes_paths() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("api/"), "/api");
        assert_eq!(normalize("/a/b//"), "/a/b");
    }
}
