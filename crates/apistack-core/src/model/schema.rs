//! Declarative request-body schema documents.
//!
//! Draft-04, which is what API gateway request models accept. The keywords
//! synthesis inspects are typed fields; any other keyword (`minimum`,
//! `pattern`, `anyOf`, ...) is kept verbatim in `extra` and reaches the
//! compiled validator unchanged. Documents are recursive and may carry named
//! `definitions` that nested schemas address with `$ref: "#/definitions/<name>"`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Draft-04 meta-schema URI stamped on compiled models.
pub const DRAFT4_SCHEMA_URI: &str = "http://json-schema.org/draft-04/schema#";

/// Prefix every local reference must use.
pub const DEFINITIONS_PREFIX: &str = "#/definitions/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// A schema document or sub-schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDoc {
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaDoc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<SchemaDoc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub definitions: BTreeMap<String, SchemaDoc>,
    /// Keywords without a typed field above.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SchemaDoc {
    pub fn of_type(t: SchemaType) -> Self {
        Self {
            schema_type: Some(t),
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self::of_type(SchemaType::Object)
    }

    pub fn array() -> Self {
        Self::of_type(SchemaType::Array)
    }

    pub fn string() -> Self {
        Self::of_type(SchemaType::String)
    }

    /// A `$ref` to a named definition of the enclosing document.
    pub fn reference(definition: &str) -> Self {
        Self {
            reference: Some(format!("{DEFINITIONS_PREFIX}{definition}")),
            ..Self::default()
        }
    }

    pub fn title(mut self, t: impl Into<String>) -> Self {
        self.title = Some(t.into());
        self
    }

    pub fn description(mut self, d: impl Into<String>) -> Self {
        self.description = Some(d.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, schema: SchemaDoc) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn require<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn enumeration<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(|v| Value::String(v.into())).collect());
        self
    }

    pub fn items(mut self, schema: SchemaDoc) -> Self {
        self.items = Some(Box::new(schema));
        self
    }

    pub fn min_items(mut self, n: u64) -> Self {
        self.min_items = Some(n);
        self
    }

    pub fn definition(mut self, name: impl Into<String>, schema: SchemaDoc) -> Self {
        self.definitions.insert(name.into(), schema);
        self
    }

    /// Direct sub-schemas (properties, items, oneOf branches, definitions).
    pub fn children(&self) -> Vec<(String, &SchemaDoc)> {
        let mut out: Vec<(String, &SchemaDoc)> = Vec::new();
        for (k, v) in &self.properties {
            out.push((format!("properties/{k}"), v));
        }
        if let Some(items) = &self.items {
            out.push(("items".to_string(), items.as_ref()));
        }
        if let Some(branches) = &self.one_of {
            for (i, b) in branches.iter().enumerate() {
                out.push((format!("oneOf/{i}"), b));
            }
        }
        for (k, v) in &self.definitions {
            out.push((format!("definitions/{k}"), v));
        }
        out
    }
}

/// The request body accepted by `POST /api`: a non-empty array of
/// `{content: {photoUrl, text, type: "text"|"image"}}` wrappers.
pub fn content_body_schema() -> SchemaDoc {
    let data_type = SchemaDoc::object()
        .require(["photoUrl", "text", "type"])
        .property("photoUrl", SchemaDoc::string())
        .property("text", SchemaDoc::string().description("string"))
        .property("type", SchemaDoc::string().enumeration(["text", "image"]));

    let content = SchemaDoc::object()
        .require(["content"])
        .property("content", SchemaDoc::reference("DataType"));

    SchemaDoc::array()
        .title("request body validation")
        .min_items(1)
        .definition("DataType", data_type)
        .definition("Content", content)
        .items(SchemaDoc::reference("Content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_schema_uses_wire_keywords() {
        let v = serde_json::to_value(content_body_schema()).unwrap();
        assert_eq!(v["type"], "array");
        assert_eq!(v["minItems"], 1);
        assert_eq!(v["items"]["$ref"], "#/definitions/Content");
        assert_eq!(
            v["definitions"]["DataType"]["properties"]["type"]["enum"],
            json!(["text", "image"])
        );
    }

    #[test]
    fn decodes_from_json() {
        let doc: SchemaDoc = serde_json::from_value(json!({
            "type": "object",
            "required": ["a"],
            "properties": {"a": {"$ref": "#/definitions/A"}},
            "definitions": {"A": {"type": "string"}}
        }))
        .unwrap();
        assert_eq!(doc.schema_type, Some(SchemaType::Object));
        assert_eq!(doc.children().len(), 2);
        assert!(doc.extra.is_empty());
    }

    #[test]
    fn unmodelled_keywords_survive_round_trip() {
        let input = json!({
            "type": "object",
            "properties": {"n": {"type": "integer", "minimum": 1, "multipleOf": 2}},
            "patternProperties": {"^x-": {"type": "string"}}
        });
        let doc: SchemaDoc = serde_json::from_value(input.clone()).unwrap();
        assert_eq!(doc.properties["n"].extra["minimum"], 1);
        assert!(doc.extra.contains_key("patternProperties"));
        assert_eq!(serde_json::to_value(&doc).unwrap(), input);
    }
}
