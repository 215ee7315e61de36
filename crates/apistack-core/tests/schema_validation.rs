//! schema_validation.rs
//!
//! The synthesized body model accepts and rejects request bodies the way the
//! gateway validator would.

use apistack_core::prelude::*;
use serde_json::json;

fn body_validator() -> BodyValidator {
    let m = Synthesizer::new(StackConfig::default())
        .unwrap()
        .synthesize(&StackDeclaration::demo())
        .unwrap();
    let node = m.resource("deno-api/model/RequestBodyValidationModel").unwrap();
    RequestValidationModel::from_node(node).unwrap().compile().unwrap()
}

#[test]
fn well_formed_body_accepted() {
    let v = body_validator();
    let body = json!([{"content": {"photoUrl": "u", "text": "hi", "type": "text"}}]);
    assert!(v.validate(&body).is_ok());
}

#[test]
fn unknown_enum_value_rejected() {
    let v = body_validator();
    let body = json!([{"content": {"photoUrl": "u", "text": "hi", "type": "video"}}]);
    assert!(v.validate(&body).is_err());
}

#[test]
fn empty_array_and_missing_fields_rejected() {
    let v = body_validator();
    assert!(!v.is_valid(&json!([])));
    assert!(!v.is_valid(&json!([{"content": {"text": "hi", "type": "text"}}])));
    assert!(!v.is_valid(&json!({"content": {}})));
}

#[test]
fn dangling_reference_fails_synthesis() {
    let mut decl = StackDeclaration::demo();
    decl.models[0].schema = SchemaDoc::array().items(SchemaDoc::reference("Missing"));
    let err = Synthesizer::new(StackConfig::default())
        .unwrap()
        .synthesize(&decl)
        .unwrap_err();
    assert!(matches!(err, SynthError::SchemaRef { .. }));
}

#[test]
fn validation_disabled_emits_no_models() {
    let cfg = StackConfig {
        enable_validation: false,
        ..StackConfig::default()
    };
    let m = Synthesizer::new(cfg)
        .unwrap()
        .synthesize(&StackDeclaration::demo())
        .unwrap();
    assert_eq!(m.count_of_kind(ResourceKind::ValidationModel), 0);
    assert_eq!(m.count_of_kind(ResourceKind::Validator), 0);
    assert_eq!(m.warnings.len(), 1);
}
