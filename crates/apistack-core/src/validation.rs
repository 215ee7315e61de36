//! Request validation models.
//!
//! `ValidationModelBuilder` turns a declarative body schema into two graph
//! nodes: a `ValidationModel` bound to a content type and a `Validator` that
//! tells the gateway what to check. The schema is checked structurally first
//! (references, required lists, enumerations); a compiled model can then be
//! turned into a [`BodyValidator`] that accepts or rejects request bodies the
//! way the deployed gateway would.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{SynthError, SynthResult};
use crate::model::schema::{DEFINITIONS_PREFIX, DRAFT4_SCHEMA_URI};
use crate::model::{ids, ResourceKind, ResourceNode, SchemaDoc, SchemaType};

/// Content type models are bound to unless declared otherwise.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A declared request model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDeclaration {
    /// Logical name, used in ids and referenced by method declarations.
    pub name: String,
    /// Name the gateway shows for the model.
    pub model_name: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    pub schema: SchemaDoc,
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

/// What the validator checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorOptions {
    pub name: String,
    pub validator_name: String,
    pub validate_request_body: bool,
    pub validate_request_parameters: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            name: "DefaultValidator".to_string(),
            validator_name: "validate body".to_string(),
            validate_request_body: true,
            validate_request_parameters: false,
        }
    }
}

/// A schema bound to a content type.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestValidationModel {
    pub content_type: String,
    pub schema: SchemaDoc,
}

impl RequestValidationModel {
    /// Recover a model from a `ValidationModel` node's properties.
    pub fn from_node(node: &ResourceNode) -> SynthResult<Self> {
        if node.kind != ResourceKind::ValidationModel {
            return Err(SynthError::invalid_argument(format!(
                "{} is a {}, not a ValidationModel",
                node.id, node.kind
            )));
        }
        let content_type = node
            .property_str("contentType")
            .ok_or_else(|| SynthError::invalid_argument(format!("{} has no contentType", node.id)))?
            .to_string();
        let schema_value = node
            .property("schema")
            .ok_or_else(|| SynthError::invalid_argument(format!("{} has no schema", node.id)))?;
        let schema: SchemaDoc = serde_json::from_value(schema_value.clone())?;
        Ok(Self {
            content_type,
            schema,
        })
    }

    /// Compile into an instance validator.
    pub fn compile(&self) -> SynthResult<BodyValidator> {
        let schema = serde_json::to_value(&self.schema)?;
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft4)
            .build(&schema)
            .map_err(|e| SynthError::InvalidSchema {
                model: self
                    .schema
                    .title
                    .clone()
                    .unwrap_or_else(|| self.content_type.clone()),
                reason: e.to_string(),
            })?;
        Ok(BodyValidator { validator })
    }
}

/// Accepts or rejects request bodies for one model.
pub struct BodyValidator {
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for BodyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyValidator").finish_non_exhaustive()
    }
}

impl BodyValidator {
    /// Validate a decoded body. Returns every violation message on failure.
    pub fn validate(&self, body: &Value) -> Result<(), Vec<String>> {
        let errors: Vec<String> = self
            .validator
            .iter_errors(body)
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_valid(&self, body: &Value) -> bool {
        self.validator.is_valid(body)
    }
}

/// Output of [`ValidationModelBuilder::build`].
#[derive(Debug, Clone)]
pub struct CompiledValidation {
    pub model: ResourceNode,
    pub validator: ResourceNode,
    pub content_type: String,
}

impl CompiledValidation {
    pub fn model_id(&self) -> &str {
        &self.model.id
    }

    pub fn validator_id(&self) -> &str {
        &self.validator.id
    }
}

/// Compiles model declarations for one gateway.
#[derive(Debug, Clone)]
pub struct ValidationModelBuilder {
    gateway_id: String,
    options: ValidatorOptions,
}

impl ValidationModelBuilder {
    pub fn new(gateway_id: impl Into<String>, options: ValidatorOptions) -> Self {
        Self {
            gateway_id: gateway_id.into(),
            options,
        }
    }

    /// Check the schema and produce the model and validator nodes.
    pub fn build(&self, decl: &ModelDeclaration) -> SynthResult<CompiledValidation> {
        check_schema(&decl.name, &decl.schema)?;

        let mut schema = decl.schema.clone();
        if schema.schema_uri.is_none() {
            schema.schema_uri = Some(DRAFT4_SCHEMA_URI.to_string());
        }
        let schema_value = serde_json::to_value(&schema)?;

        let model = ResourceNode::new(ids::model(&self.gateway_id, &decl.name), ResourceKind::ValidationModel)
            .with_property("name", decl.model_name.clone())
            .with_property("contentType", decl.content_type.clone())
            .with_property("restApiRef", self.gateway_id.clone())
            .with_property("schema", schema_value)
            .depends_on(self.gateway_id.clone());

        let validator = ResourceNode::new(
            ids::validator(&self.gateway_id, &self.options.name),
            ResourceKind::Validator,
        )
        .with_property("name", self.options.validator_name.clone())
        .with_property("contentType", decl.content_type.clone())
        .with_property("restApiRef", self.gateway_id.clone())
        .with_property("validateRequestBody", self.options.validate_request_body)
        .with_property("validateRequestParameters", self.options.validate_request_parameters)
        .depends_on(self.gateway_id.clone());

        tracing::debug!(model = %model.id, validator = %validator.id, "compiled validation model");

        Ok(CompiledValidation {
            model,
            validator,
            content_type: decl.content_type.clone(),
        })
    }
}

/// Structural checks over a whole schema document.
pub fn check_schema(model: &str, root: &SchemaDoc) -> SynthResult<()> {
    match root.schema_type {
        Some(SchemaType::Array) | Some(SchemaType::Object) => {}
        other => {
            return Err(SynthError::InvalidSchema {
                model: model.to_string(),
                reason: format!(
                    "root type must be array or object, got {}",
                    other.map(|t| t.as_str()).unwrap_or("none")
                ),
            })
        }
    }
    check_node(model, root, root, "#")
}

fn check_node(model: &str, root: &SchemaDoc, node: &SchemaDoc, at: &str) -> SynthResult<()> {
    let invalid = |reason: String| SynthError::InvalidSchema {
        model: model.to_string(),
        reason: format!("{at}: {reason}"),
    };

    if let Some(reference) = &node.reference {
        let resolved = reference
            .strip_prefix(DEFINITIONS_PREFIX)
            .map(|name| root.definitions.contains_key(name))
            .unwrap_or(false);
        if !resolved {
            return Err(SynthError::SchemaRef {
                model: model.to_string(),
                reference: reference.clone(),
            });
        }
    }

    let mut seen = BTreeSet::new();
    for name in &node.required {
        if name.trim().is_empty() {
            return Err(invalid("required entries must be non-empty".to_string()));
        }
        if !seen.insert(name.as_str()) {
            return Err(invalid(format!("required entry {name:?} is listed twice")));
        }
        if !node.properties.is_empty() && !node.properties.contains_key(name) {
            return Err(invalid(format!("required entry {name:?} is not a declared property")));
        }
    }

    if let Some(values) = &node.enum_values {
        if values.is_empty() {
            return Err(invalid("enum must not be empty".to_string()));
        }
        let mut distinct = BTreeSet::new();
        for v in values {
            if !distinct.insert(v.to_string()) {
                return Err(invalid(format!("enum value {v} is listed twice")));
            }
        }
    }

    if let (Some(min), Some(max)) = (node.min_items, node.max_items) {
        if min > max {
            return Err(invalid(format!("minItems {min} exceeds maxItems {max}")));
        }
    }
    if let (Some(min), Some(max)) = (node.min_length, node.max_length) {
        if min > max {
            return Err(invalid(format!("minLength {min} exceeds maxLength {max}")));
        }
    }

    if let Some(branches) = &node.one_of {
        if branches.is_empty() {
            return Err(invalid("oneOf must not be empty".to_string()));
        }
    }

    for (key, child) in node.children() {
        check_node(model, root, child, &format!("{at}/{key}"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::content_body_schema;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn decl(schema: SchemaDoc) -> ModelDeclaration {
        ModelDeclaration {
            name: "RequestBodyValidationModel".into(),
            model_name: "bodyValidation".into(),
            content_type: DEFAULT_CONTENT_TYPE.into(),
            schema,
        }
    }

    #[test]
    fn builds_model_and_validator() {
        let b = ValidationModelBuilder::new("deno-api", ValidatorOptions::default());
        let out = b.build(&decl(content_body_schema())).unwrap();
        assert_eq!(out.model.kind, ResourceKind::ValidationModel);
        assert_eq!(out.model.property_str("contentType"), Some("application/json"));
        assert_eq!(
            out.model.property("schema").unwrap()["$schema"],
            DRAFT4_SCHEMA_URI
        );
        assert_eq!(out.validator.property_bool("validateRequestBody"), Some(true));
        assert_eq!(out.validator.property_bool("validateRequestParameters"), Some(false));
        assert!(out.model.depends_on.contains("deno-api"));
    }

    #[test]
    fn unresolved_ref_fails() {
        let schema = SchemaDoc::array().items(SchemaDoc::reference("Missing"));
        let err = check_schema("m", &schema).unwrap_err();
        assert_matches!(err, SynthError::SchemaRef { ref reference, .. } if reference == "#/definitions/Missing");
    }

    #[test]
    fn non_local_ref_fails() {
        let mut schema = SchemaDoc::object();
        schema.reference = Some("http://example.com/other.json".into());
        assert_matches!(check_schema("m", &schema).unwrap_err(), SynthError::SchemaRef { .. });
    }

    #[test]
    fn scalar_root_rejected() {
        assert_matches!(
            check_schema("m", &SchemaDoc::string()).unwrap_err(),
            SynthError::InvalidSchema { .. }
        );
    }

    #[test]
    fn empty_enum_rejected() {
        let mut s = SchemaDoc::string();
        s.enum_values = Some(vec![]);
        let schema = SchemaDoc::object().property("type", s);
        assert!(check_schema("m", &schema).is_err());
    }

    #[test]
    fn required_must_name_declared_properties() {
        let schema = SchemaDoc::object()
            .property("a", SchemaDoc::string())
            .require(["a", "b"]);
        let err = check_schema("m", &schema).unwrap_err();
        assert!(err.to_string().contains("\"b\""));
    }

    #[test]
    fn duplicate_required_rejected() {
        let schema = SchemaDoc::object().require(["a", "a"]);
        assert!(check_schema("m", &schema).is_err());
    }

    #[test]
    fn compiled_model_accepts_and_rejects() {
        let b = ValidationModelBuilder::new("deno-api", ValidatorOptions::default());
        let out = b.build(&decl(content_body_schema())).unwrap();
        let model = RequestValidationModel::from_node(&out.model).unwrap();
        let v = model.compile().unwrap();

        v.validate(&json!([{"content": {"photoUrl": "http://x", "text": "hi", "type": "text"}}]))
            .unwrap();
        assert!(!v.is_valid(&json!([{"content": {"photoUrl": "http://x", "text": "hi"}}])));
        assert!(!v.is_valid(&json!([])));
        assert!(!v.is_valid(&json!([{"content": {"photoUrl": "u", "text": "t", "type": "video"}}])));
    }

    #[test]
    fn unmodelled_keywords_are_enforced() {
        let schema: SchemaDoc = serde_json::from_value(json!({
            "type": "object",
            "properties": {"n": {"type": "integer", "minimum": 1}}
        }))
        .unwrap();
        let b = ValidationModelBuilder::new("deno-api", ValidatorOptions::default());
        let out = b.build(&decl(schema)).unwrap();
        assert_eq!(out.model.property("schema").unwrap()["properties"]["n"]["minimum"], 1);

        let v = RequestValidationModel::from_node(&out.model).unwrap().compile().unwrap();
        assert!(v.is_valid(&json!({"n": 1})));
        assert!(!v.is_valid(&json!({"n": 0})));
    }
}
