//! demo_manifest.rs
//!
//! Shape of the manifest synthesized for the bundled greeting API stack.

use apistack_core::prelude::*;

fn manifest() -> Manifest {
    Synthesizer::new(StackConfig::default())
        .unwrap()
        .synthesize(&StackDeclaration::demo())
        .unwrap()
}

#[test]
fn layer_precedes_function_and_function_precedes_integration() {
    let m = manifest();
    let layer = m.position("deno-layer").unwrap();
    let function = m.position("NameHandler").unwrap();
    let integration = m.position("deno-api/integration/NameHandler").unwrap();
    assert!(layer < function);
    assert!(function < integration);
}

#[test]
fn compute_properties_pass_through() {
    let m = manifest();
    let f = m.resource("NameHandler").unwrap();
    assert_eq!(f.kind, ResourceKind::ComputeFunction);
    assert_eq!(f.property_str("runtime"), Some("provided"));
    assert_eq!(f.property_str("handler"), Some("app.handler"));
    assert_eq!(f.property_str("tracing"), Some("Active"));
    assert_eq!(f.property("environment").unwrap()["DENO_UNSTABLE"], "--unstable");
    assert_eq!(f.property("timeoutSeconds").unwrap(), 30);
    assert_eq!(f.property("memoryMb").unwrap(), 256);
}

#[test]
fn methods_carry_key_requirement_and_integration() {
    let m = manifest();
    let methods: Vec<&ResourceNode> = m.resources_of_kind(ResourceKind::Method).collect();
    assert_eq!(methods.len(), 2);
    for method in methods {
        assert_eq!(method.property_bool("requiresApiKey"), Some(true));
        assert_eq!(
            method.property_str("integrationRef"),
            Some("deno-api/integration/NameHandler")
        );
    }
}

#[test]
fn get_method_is_documented() {
    let m = manifest();
    let doc = m.resource("deno-api/documentation/api/GET").unwrap();
    assert_eq!(doc.kind, ResourceKind::DocumentationPart);
    assert_eq!(doc.property("properties").unwrap()["code"], 200);
    assert_eq!(doc.property("location").unwrap()["method"], "GET");
    assert!(m.position("deno-api/documentation/api/GET") > m.position("deno-api/method/api/GET"));
}

#[test]
fn manifest_parses_back_and_verifies() {
    let m = manifest();
    let text = m.to_json_pretty().unwrap();
    let back = Manifest::from_json_bytes(text.as_bytes()).unwrap();
    assert_eq!(back.digest, m.digest);
    assert!(back.errors.is_empty());
}

#[test]
fn wire_property_names() {
    let m = manifest();

    let post = m.resource("deno-api/method/api/POST").unwrap();
    assert_eq!(post.property_str("httpVerb"), Some("POST"));
    assert_eq!(post.property_bool("requiresApiKey"), Some(true));
    assert!(post.property("httpMethod").is_none());
    assert!(post.property("apiKeyRequired").is_none());

    let stage = m.resource("deno-api/stage/dev").unwrap();
    assert_eq!(stage.property_str("name"), Some("dev"));
    assert!(stage.property("stageName").is_none());

    let plan = m.resource("deno-api/usage-plan/deno-api-usage-plan").unwrap();
    assert_eq!(plan.property("defaultThrottle").unwrap()["rateLimit"], 10);
    assert_eq!(plan.property("defaultThrottle").unwrap()["burstLimit"], 2);
    assert!(plan.property("throttle").is_none());
}
