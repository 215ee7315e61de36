//! apistack-core
//!
//! Core primitives for apistack:
//! - Resource nodes, the gateway path tree and the dependency graph
//! - Provisioning-order resolution (deterministic topological sort)
//! - Request validation models, access binding and deployment resolution
//! - The synthesis pipeline and the manifest it emits
//! - Canonical JSON encoding and domain-separated hashing

pub mod access;
pub mod config;
pub mod declare;
pub mod deployment;
pub mod determinism;
pub mod errors;
pub mod graph;
pub mod model;
pub mod pipeline;
pub mod validation;
pub mod version;

pub use crate::errors::{SynthError, SynthResult};

/// Current manifest wire version.
pub const MANIFEST_VERSION_V1: &str = "v1";

/// Domain separation labels.
/// These must remain stable across versions.
pub mod domain {
    pub const MANIFEST: &str = "apistack.v1.manifest";
    pub const DEPLOYMENT: &str = "apistack.v1.deployment";
}

/// Convenience re-exports.
pub mod prelude {
    pub use crate::access::{AccessBinding, AccessControlBinder, MethodThrottle};
    pub use crate::config::{HashAlgorithm, LimitsConfig, MethodCeiling, StackConfig, ThrottlePolicy};
    pub use crate::declare::{
        ComputeDeclaration, GatewayDeclaration, LayerDeclaration, MethodDeclaration, RuntimeKind,
        StackDeclaration, TracingMode, UsagePlanDeclaration,
    };
    pub use crate::deployment::{DeploymentOutcome, DeploymentResolution, DeploymentResolver, DeploymentState};
    pub use crate::graph::ResourceGraph;
    pub use crate::model::{
        ApiResourceTree, HttpVerb, Manifest, ResourceKind, ResourceNode, SchemaDoc, ThrottleSettings, UsagePlan,
    };
    pub use crate::pipeline::synth::{SynthesisReport, Synthesizer};
    pub use crate::validation::{
        BodyValidator, CompiledValidation, ModelDeclaration, RequestValidationModel, ValidationModelBuilder,
        ValidatorOptions,
    };
    pub use crate::{SynthError, SynthResult};
}
