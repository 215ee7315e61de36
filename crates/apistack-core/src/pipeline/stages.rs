//! Built-in synthesis stages.
//!
//! Each stage reads the declaration from the context and inserts nodes into
//! the graph. Stages run in the order listed by [`standard_pipeline`]; later
//! stages rely on the nodes and compiled models earlier ones left behind.
//! None of them perform I/O.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::access::{ensure_methods_bound, AccessControlBinder, MethodThrottle};
use crate::deployment::{implicit_snapshot, DeploymentOutcome, DeploymentResolver};
use crate::errors::{SynthError, SynthResult};
use crate::model::{ids, ApiResourceTree, ResourceKind, ResourceNode};
use crate::pipeline::{Diagnostic, Pipeline, Stage, SynthContext};
use crate::validation::ValidationModelBuilder;

pub const COMPUTE_DECLARE: &str = "compute.declare";
pub const GATEWAY_DECLARE: &str = "gateway.declare";
pub const VALIDATION_BUILD: &str = "validation.build";
pub const GATEWAY_METHODS: &str = "gateway.methods";
pub const GATEWAY_DOCUMENTATION: &str = "gateway.documentation";
pub const GATEWAY_SNAPSHOT: &str = "gateway.snapshot";
pub const DEPLOYMENT_RESOLVE: &str = "deployment.resolve";
pub const ACCESS_BIND: &str = "access.bind";
pub const ACCESS_VERIFY: &str = "access.verify";

/// The stage list every synthesis run uses.
pub fn standard_pipeline() -> Pipeline {
    let mut p = Pipeline::new();
    p.push_stage(ComputeDeclareStage)
        .push_stage(GatewayDeclareStage)
        .push_stage(ValidationBuildStage)
        .push_stage(GatewayMethodsStage)
        .push_stage(DocumentationStage)
        .push_stage(SnapshotStage)
        .push_stage(DeploymentResolveStage)
        .push_stage(AccessBindStage)
        .push_stage(AccessVerifyStage);
    p
}

/// Graph id of the node a resource or method at `path` hangs from.
fn parent_ref(gateway: &str, tree: &ApiResourceTree, at: usize) -> String {
    match tree.parent(at) {
        Some(p) if p != ApiResourceTree::ROOT => tree
            .full_path(p)
            .map(|path| ids::resource(gateway, path))
            .unwrap_or_else(|| gateway.to_string()),
        _ => gateway.to_string(),
    }
}

fn resource_ref(gateway: &str, tree: &ApiResourceTree, at: usize) -> String {
    if at == ApiResourceTree::ROOT {
        return gateway.to_string();
    }
    tree.full_path(at)
        .map(|path| ids::resource(gateway, path))
        .unwrap_or_else(|| gateway.to_string())
}

/// Stage: layers and the compute function.
pub struct ComputeDeclareStage;

impl Stage for ComputeDeclareStage {
    fn id(&self) -> &str {
        COMPUTE_DECLARE
    }

    fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()> {
        let decl = ctx.declaration;
        let compute = &decl.compute;

        let mut function = ResourceNode::new(compute.logical_id.clone(), ResourceKind::ComputeFunction)
            .with_property("functionName", compute.function_name.clone())
            .with_property("runtime", compute.runtime.as_str())
            .with_property("handler", compute.handler.clone())
            .with_property("codeAsset", compute.code_asset.clone())
            .with_property("timeoutSeconds", compute.timeout_seconds)
            .with_property("memoryMb", compute.memory_mb)
            .with_property("tracing", compute.tracing.as_str())
            .with_property("environment", serde_json::to_value(&compute.environment)?);

        let mut layer_refs = Vec::with_capacity(compute.layers.len());
        for layer in &compute.layers {
            let mut node = ResourceNode::new(layer.logical_id.clone(), ResourceKind::Layer)
                .with_property("layerName", layer.layer_name.clone())
                .with_property("codeAsset", layer.code_asset.clone())
                .with_property("compatibleRuntimes", json!([compute.runtime.as_str()]));
            if let Some(license) = &layer.license {
                node.set_property("license", license.clone());
            }
            ctx.graph.add_node(node)?;
            function.add_dependency(layer.logical_id.clone());
            layer_refs.push(Value::from(layer.logical_id.clone()));
        }
        function.set_property("layerRefs", Value::Array(layer_refs));

        ctx.graph.add_node(function)?;
        Ok(())
    }
}

/// Stage: the gateway and one resource node per path segment.
pub struct GatewayDeclareStage;

impl Stage for GatewayDeclareStage {
    fn id(&self) -> &str {
        GATEWAY_DECLARE
    }

    fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()> {
        let decl = ctx.declaration;
        let gw = &decl.gateway;
        let gateway_id = ctx.gateway_id();

        ctx.graph.add_node(
            ResourceNode::new(gateway_id, ResourceKind::Gateway)
                .with_property("name", gw.name.clone())
                .with_property("deploy", gw.auto_deploy),
        )?;

        let max_depth = ctx.config.limits.max_path_depth;
        for m in &decl.methods {
            let at = ctx.tree.ensure_path(&m.path)?;
            if ctx.tree.depth(at).unwrap_or(0) > max_depth {
                return Err(SynthError::invalid_argument(format!(
                    "path {} is deeper than {max_depth} segments",
                    m.path
                )));
            }
        }

        for at in ctx.tree.resources() {
            let (Some(path), Some(segment)) = (ctx.tree.full_path(at), ctx.tree.segment(at)) else {
                continue;
            };
            let parent = parent_ref(gateway_id, &ctx.tree, at);
            let node = ResourceNode::new(ids::resource(gateway_id, path), ResourceKind::Resource)
                .with_property("pathPart", segment)
                .with_property("path", path)
                .with_property("parentRef", parent.clone())
                .with_property("restApiRef", gateway_id)
                .depends_on(parent);
            ctx.graph.add_node(node)?;
        }
        Ok(())
    }
}

/// Stage: compile declared request models.
pub struct ValidationBuildStage;

impl Stage for ValidationBuildStage {
    fn id(&self) -> &str {
        VALIDATION_BUILD
    }

    fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()> {
        let decl = ctx.declaration;
        if !ctx.config.enable_validation {
            ctx.push_info("validation.disabled", "request validation disabled; no models emitted");
            return Ok(());
        }

        let builder = ValidationModelBuilder::new(ctx.gateway_id(), decl.validator.clone());
        for model in &decl.models {
            let compiled = builder.build(model)?;
            ctx.graph.add_node(compiled.model.clone())?;
            // One validator per gateway, shared by every model.
            if !ctx.graph.contains(compiled.validator_id()) {
                ctx.graph.add_node(compiled.validator.clone())?;
            }
            ctx.validations.insert(model.name.clone(), compiled);
        }
        Ok(())
    }
}

/// Stage: the proxy integration and one method node per declared route.
pub struct GatewayMethodsStage;

impl Stage for GatewayMethodsStage {
    fn id(&self) -> &str {
        GATEWAY_METHODS
    }

    fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()> {
        let decl = ctx.declaration;
        let gateway_id = ctx.gateway_id();
        let function_id = decl.compute.logical_id.clone();

        let integration_id = ids::integration(gateway_id, &function_id);
        ctx.graph.add_node(
            ResourceNode::new(integration_id.clone(), ResourceKind::Integration)
                .with_property("type", "AWS_PROXY")
                .with_property("integrationHttpMethod", "POST")
                .with_property("functionRef", function_id.clone())
                .with_property("restApiRef", gateway_id)
                .depends_on(function_id)
                .depends_on(gateway_id),
        )?;

        let max_methods = ctx.config.limits.max_methods;
        for m in &decl.methods {
            let at = ctx.tree.ensure_path(&m.path)?;
            ctx.tree.add_method(at, m.verb)?;
            if ctx.tree.method_count() > max_methods {
                return Err(SynthError::invalid_argument(format!(
                    "more than {max_methods} methods declared"
                )));
            }

            let path = ctx.tree.full_path(at).unwrap_or("/").to_string();
            let method_id = ids::method(gateway_id, &path, m.verb);
            let resource = resource_ref(gateway_id, &ctx.tree, at);

            let mut node = ResourceNode::new(method_id.clone(), ResourceKind::Method)
                .with_property("httpVerb", m.verb.as_str())
                .with_property("path", path.clone())
                .with_property("resourceRef", resource.clone())
                .with_property("restApiRef", gateway_id)
                .with_property("integrationRef", integration_id.clone())
                .with_property("requiresApiKey", m.requires_api_key)
                .depends_on(resource)
                .depends_on(integration_id.clone());

            let mut request_models = BTreeMap::new();
            if let Some(model_name) = &m.body_schema_ref {
                match ctx.validations.get(model_name) {
                    Some(compiled) => {
                        request_models.insert(compiled.content_type.clone(), compiled.model_id().to_string());
                        let validator_id = compiled.validator_id().to_string();
                        let validator_content_type = ctx
                            .graph
                            .get(&validator_id)
                            .and_then(|v| v.property_str("contentType"))
                            .unwrap_or(compiled.content_type.as_str())
                            .to_string();
                        if !request_models.contains_key(&validator_content_type) {
                            return Err(SynthError::MissingRequestModel {
                                method: method_id,
                                content_type: validator_content_type,
                            });
                        }
                        node.set_property("validatorRef", validator_id.clone());
                        node.add_dependency(validator_id);
                        node.add_dependency(compiled.model_id().to_string());
                    }
                    None if !ctx.config.enable_validation => {
                        ctx.push(
                            Diagnostic::warning(
                                "validation.skipped",
                                format!("{method_id}: body model {model_name} not applied, validation disabled"),
                            )
                            .with_data("node", method_id.clone()),
                        );
                    }
                    None => {
                        return Err(SynthError::invalid_argument(format!(
                            "{method_id} references undeclared model {model_name}"
                        )));
                    }
                }
            }
            node.set_property("requestModels", serde_json::to_value(&request_models)?);

            ctx.graph.add_node(node)?;
        }
        Ok(())
    }
}

/// Stage: documentation parts for documented methods.
pub struct DocumentationStage;

impl Stage for DocumentationStage {
    fn id(&self) -> &str {
        GATEWAY_DOCUMENTATION
    }

    fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()> {
        let decl = ctx.declaration;
        if !ctx.config.enable_documentation {
            return Ok(());
        }
        let gateway_id = ctx.gateway_id();

        for m in &decl.methods {
            let Some(doc) = &m.documentation else {
                continue;
            };
            let at = ctx.tree.ensure_path(&m.path)?;
            let path = ctx.tree.full_path(at).unwrap_or("/").to_string();
            let method_id = ids::method(gateway_id, &path, m.verb);

            let node = ResourceNode::new(ids::documentation(gateway_id, &path, m.verb), ResourceKind::DocumentationPart)
                .with_property(
                    "location",
                    json!({"type": "METHOD", "method": m.verb.as_str(), "path": path}),
                )
                .with_property("properties", Value::Object(doc.clone()))
                .with_property("restApiRef", gateway_id)
                .depends_on(method_id);
            ctx.graph.add_node(node)?;
        }
        Ok(())
    }
}

/// Stage: the snapshot an auto-deploying gateway produces on its own.
pub struct SnapshotStage;

impl Stage for SnapshotStage {
    fn id(&self) -> &str {
        GATEWAY_SNAPSHOT
    }

    fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()> {
        let decl = ctx.declaration;
        if !decl.gateway.auto_deploy {
            return Ok(());
        }
        let created_at = ctx.clock.tick();
        let node = implicit_snapshot(&ctx.graph, ctx.gateway_id(), ctx.config.digest, created_at)?;
        ctx.graph.add_node(node)
    }
}

/// Stage: reuse or create the deployment and bind the stage.
pub struct DeploymentResolveStage;

impl Stage for DeploymentResolveStage {
    fn id(&self) -> &str {
        DEPLOYMENT_RESOLVE
    }

    fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()> {
        let decl = ctx.declaration;
        let created_at = ctx.clock.tick();
        let resolution = DeploymentResolver::new(&ctx.graph, ctx.gateway_id(), ctx.config.digest)
            .resolve(&decl.gateway.stage_name, created_at)?;

        if let Some(deployment) = &resolution.deployment {
            ctx.graph.add_node(deployment.clone())?;
        }
        ctx.graph.add_node(resolution.stage.clone())?;

        let verb = match &resolution.outcome {
            DeploymentOutcome::Reused { .. } => "reused",
            DeploymentOutcome::Created { .. } => "created",
        };
        let deployment_id = resolution.outcome.deployment_id();
        ctx.push(
            Diagnostic::info("deployment.resolved", format!("{verb} deployment {deployment_id}"))
                .with_data("node", deployment_id),
        );
        ctx.deployment = Some(resolution);
        Ok(())
    }
}

/// Stage: API key and usage plan.
pub struct AccessBindStage;

impl Stage for AccessBindStage {
    fn id(&self) -> &str {
        ACCESS_BIND
    }

    fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()> {
        let decl = ctx.declaration;
        if !ctx.config.enable_usage_plan {
            ctx.push_info("access.disabled", "usage plan disabled; no key or plan emitted");
            return Ok(());
        }
        let Some(plan_decl) = &decl.usage_plan else {
            return Ok(());
        };
        let stage_id = ctx
            .deployment
            .as_ref()
            .map(|d| d.stage.id.clone())
            .ok_or_else(|| SynthError::invariant("access binding requires a resolved stage"))?;

        let gateway_id = ctx.gateway_id();
        let mut overrides = Vec::new();
        for m in &decl.methods {
            let Some(throttle) = m.throttle else {
                continue;
            };
            let at = ctx.tree.ensure_path(&m.path)?;
            let path = ctx.tree.full_path(at).unwrap_or("/");
            overrides.push(MethodThrottle {
                method_id: ids::method(gateway_id, path, m.verb),
                throttle,
            });
        }

        let binding = AccessControlBinder::new(gateway_id, ctx.config.throttle.clone()).bind(
            &stage_id,
            &plan_decl.key_name,
            &plan_decl.name,
            plan_decl.throttle,
            &overrides,
        )?;

        let plan_id = binding.usage_plan.id.clone();
        ctx.graph.add_node(binding.api_key)?;
        ctx.graph.add_node(binding.usage_plan)?;
        for w in binding.warnings {
            ctx.push(Diagnostic::warning("access.method_throttle", w).with_data("node", plan_id.clone()));
        }
        ctx.plans.push(binding.plan);
        Ok(())
    }
}

/// Stage: every key-protected method is covered by a plan.
pub struct AccessVerifyStage;

impl Stage for AccessVerifyStage {
    fn id(&self) -> &str {
        ACCESS_VERIFY
    }

    fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()> {
        let methods = ctx
            .graph
            .nodes_of_kind(ResourceKind::Method)
            .map(|m| (m.id.as_str(), m.property_bool("requiresApiKey").unwrap_or(false)));
        ensure_methods_bound(methods, &ctx.plans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StackConfig;
    use crate::declare::StackDeclaration;
    use assert_matches::assert_matches;

    #[test]
    fn standard_pipeline_stage_order() {
        assert_eq!(
            standard_pipeline().stage_ids(),
            vec![
                COMPUTE_DECLARE,
                GATEWAY_DECLARE,
                VALIDATION_BUILD,
                GATEWAY_METHODS,
                GATEWAY_DOCUMENTATION,
                GATEWAY_SNAPSHOT,
                DEPLOYMENT_RESOLVE,
                ACCESS_BIND,
                ACCESS_VERIFY,
            ]
        );
    }

    #[test]
    fn methods_reference_validator_and_model() {
        let decl = StackDeclaration::demo();
        let cfg = StackConfig::default();
        let mut ctx = SynthContext::new(&decl, &cfg);
        standard_pipeline().run(&mut ctx).unwrap();

        let post = ctx.graph.get("deno-api/method/api/POST").unwrap();
        assert_eq!(post.property_str("validatorRef"), Some("deno-api/validator/DefaultValidator"));
        assert_eq!(
            post.property("requestModels").unwrap()["application/json"],
            "deno-api/model/RequestBodyValidationModel"
        );
        assert!(post.depends_on.contains("deno-api/resource/api"));

        let get = ctx.graph.get("deno-api/method/api/GET").unwrap();
        assert!(get.property_str("validatorRef").is_none());
        assert!(ctx.graph.contains("deno-api/documentation/api/GET"));
    }

    #[test]
    fn nested_resources_chain_to_parent() {
        let mut decl = StackDeclaration::demo();
        decl.methods[1].path = "/api/v1/names".to_string();
        let cfg = StackConfig::default();
        let mut ctx = SynthContext::new(&decl, &cfg);
        standard_pipeline().run(&mut ctx).unwrap();

        let names = ctx.graph.get("deno-api/resource/api/v1/names").unwrap();
        assert!(names.depends_on.contains("deno-api/resource/api/v1"));
        let api = ctx.graph.get("deno-api/resource/api").unwrap();
        assert!(api.depends_on.contains("deno-api"));
    }

    #[test]
    fn duplicate_route_rejected() {
        let mut decl = StackDeclaration::demo();
        decl.methods[1].verb = crate::model::HttpVerb::Post;
        let cfg = StackConfig::default();
        let mut ctx = SynthContext::new(&decl, &cfg);
        let err = standard_pipeline().run(&mut ctx).unwrap_err();
        assert_matches!(err, SynthError::DuplicateRoute { ref path, .. } if path == "/api");
    }

    #[test]
    fn disabled_documentation_emits_no_parts() {
        let decl = StackDeclaration::demo();
        let cfg = StackConfig {
            enable_documentation: false,
            ..StackConfig::default()
        };
        let mut ctx = SynthContext::new(&decl, &cfg);
        standard_pipeline().run(&mut ctx).unwrap();
        assert_eq!(ctx.graph.nodes_of_kind(ResourceKind::DocumentationPart).count(), 0);
    }
}
