//! Synthesis pipeline primitives.
//!
//! Synthesis runs as an ordered list of stages over a shared [`SynthContext`]:
//! - compute and gateway declarations become graph nodes
//! - request models are compiled and attached to methods
//! - the deployment is resolved and a stage bound to it
//! - keys and usage plans are bound and coverage is checked
//!
//! This module defines:
//! - the `Stage` trait and `Pipeline`
//! - `SynthContext` (declarations, config, logical clock, graph, diagnostics)
//! - `Diagnostic` (structured info/warning records)
//!
//! The core crate does not do network or filesystem I/O. Callers pass
//! declarations in and get a manifest out.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::StackConfig;
use crate::declare::StackDeclaration;
use crate::deployment::DeploymentResolution;
use crate::errors::SynthResult;
use crate::graph::ResourceGraph;
use crate::model::{ApiResourceTree, UsagePlan};
use crate::validation::CompiledValidation;

pub mod stages;
pub mod synth;

/// A stable identifier for a pipeline stage.
///
/// Use dot-delimited namespaces:
/// - `compute.declare`
/// - `gateway.methods`
/// - `access.verify`
pub type StageId = String;

/// A structured diagnostic emitted by pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, String>,
}

impl Diagnostic {
    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            code: code.into(),
            message: message.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            ..Self::info(code, message)
        }
    }

    /// Attach a key/value pair, e.g. the node the diagnostic is about.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
}

/// A deterministic logical clock.
///
/// Core does not read system time. Anything that needs a "when" takes the
/// next logical version instead, starting from the caller-chosen epoch.
#[derive(Debug, Clone, Default)]
pub struct LogicalClock {
    version: u64,
}

impl LogicalClock {
    pub fn starting_at(version: u64) -> Self {
        Self { version }
    }

    /// Advance and return the new version.
    pub fn tick(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    pub fn current(&self) -> u64 {
        self.version
    }
}

/// State shared by all stages of one synthesis run.
#[derive(Debug)]
pub struct SynthContext<'a> {
    pub declaration: &'a StackDeclaration,
    pub config: &'a StackConfig,
    pub clock: LogicalClock,

    pub graph: ResourceGraph,
    pub tree: ApiResourceTree,

    /// Compiled request models keyed by declared model name.
    pub validations: BTreeMap<String, CompiledValidation>,
    pub deployment: Option<DeploymentResolution>,
    pub plans: Vec<UsagePlan>,

    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> SynthContext<'a> {
    pub fn new(declaration: &'a StackDeclaration, config: &'a StackConfig) -> Self {
        Self {
            declaration,
            config,
            clock: LogicalClock::default(),
            graph: ResourceGraph::new(),
            tree: ApiResourceTree::new(),
            validations: BTreeMap::new(),
            deployment: None,
            plans: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Logical id of the gateway being synthesized.
    pub fn gateway_id(&self) -> &'a str {
        let decl: &'a StackDeclaration = self.declaration;
        &decl.gateway.logical_id
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if diagnostic.level == DiagnosticLevel::Warning {
            tracing::warn!(code = %diagnostic.code, message = %diagnostic.message, "synthesis warning");
        }
        self.diagnostics.push(diagnostic);
    }

    pub fn push_info(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::info(code, message));
    }

    pub fn push_warning(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.push(Diagnostic::warning(code, message));
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
    }
}

/// A pipeline stage.
///
/// Stages are deterministic: no system time, env, randomness or I/O. Any such
/// values come in through `SynthContext`.
pub trait Stage {
    fn id(&self) -> &str;
    fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()>;
}

/// An ordered list of stages.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage + Send + Sync>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_ids())
            .finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn push_stage<S: Stage + Send + Sync + 'static>(&mut self, s: S) -> &mut Self {
        self.stages.push(Box::new(s));
        self
    }

    pub fn stages(&self) -> usize {
        self.stages.len()
    }

    pub fn stage_ids(&self) -> Vec<StageId> {
        self.stages.iter().map(|s| s.id().to_string()).collect()
    }

    /// Run every stage in order. The first error aborts the run.
    ///
    /// Diagnostics a stage pushes are tagged with its id under `stage`.
    pub fn run(&self, ctx: &mut SynthContext<'_>) -> SynthResult<()> {
        for st in &self.stages {
            let _span = tracing::debug_span!("stage", id = st.id()).entered();
            tracing::debug!("starting stage");

            let first = ctx.diagnostics.len();
            st.run(ctx)?;
            for d in &mut ctx.diagnostics[first..] {
                d.data
                    .entry("stage".to_string())
                    .or_insert_with(|| st.id().to_string());
            }

            ctx.push(
                Diagnostic::info("pipeline.stage.end", format!("completed stage {}", st.id()))
                    .with_data("stage", st.id())
                    .with_data("nodes", ctx.graph.len().to_string()),
            );
            tracing::debug!(nodes = ctx.graph.len(), "completed stage");
        }
        Ok(())
    }
}
