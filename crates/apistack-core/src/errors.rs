//! Error types for apistack-core.
//!
//! Every synthesis-time failure is deterministic: it can be discovered from
//! the declarations alone and aborts the whole synthesis. No partial manifest
//! is ever produced.

use itertools::Itertools;
use thiserror::Error;

/// Result alias used across the core crate.
pub type SynthResult<T> = Result<T, SynthError>;

/// Synthesis error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthError {
    #[error("duplicate resource id: {id}")]
    DuplicateId { id: String },

    #[error("dependency cycle detected: {}", .path.iter().join(" -> "))]
    Cycle { path: Vec<String> },

    #[error("model {model} references unresolved schema definition {reference}")]
    SchemaRef { model: String, reference: String },

    #[error("method {method} requires an API key but no usage plan stage binding covers it")]
    UnboundMethod { method: String },

    #[error("gateway {gateway} has no methods to deploy")]
    NoMethodsDeployed { gateway: String },

    #[error("resource {from} depends on unknown resource {to}")]
    UnknownDependency { from: String, to: String },

    #[error("invalid schema for model {model}: {reason}")]
    InvalidSchema { model: String, reason: String },

    #[error("invalid throttle for {scope}: {reason}")]
    InvalidThrottle { scope: String, reason: String },

    #[error("duplicate route: {verb} {path}")]
    DuplicateRoute { path: String, verb: String },

    #[error("method {method} uses a validator but declares no request model for {content_type}")]
    MissingRequestModel { method: String, content_type: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl SynthError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::Invariant(msg.into())
    }

    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DuplicateId { .. } => "graph.duplicate_id",
            Self::Cycle { .. } => "graph.cycle",
            Self::SchemaRef { .. } => "model.schema_ref",
            Self::UnboundMethod { .. } => "access.unbound_method",
            Self::NoMethodsDeployed { .. } => "deployment.no_methods",
            Self::UnknownDependency { .. } => "graph.unknown_dependency",
            Self::InvalidSchema { .. } => "model.invalid_schema",
            Self::InvalidThrottle { .. } => "access.invalid_throttle",
            Self::DuplicateRoute { .. } => "gateway.duplicate_route",
            Self::MissingRequestModel { .. } => "gateway.missing_request_model",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Serialization(_) => "serialization",
            Self::Invariant(_) => "invariant",
        }
    }
}

impl From<serde_json::Error> for SynthError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
