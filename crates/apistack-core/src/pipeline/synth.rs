//! High-level synthesis orchestration.
//!
//! The `Synthesizer` owns a validated `StackConfig` and the standard stage
//! list. `synthesize` runs the stages over a fresh context, resolves the
//! provisioning order and wraps the result in a [`Manifest`].
//!
//! Determinism contract:
//! - versions come from the logical clock (no system time reads)
//! - ordering comes from declaration order and the graph's topological sort
//! - hashes use the crate hashing utilities (domain-separated)
//! - no randomness, no env var dependence

use crate::config::{validate_config, StackConfig};
use crate::declare::StackDeclaration;
use crate::deployment::DeploymentOutcome;
use crate::errors::{SynthError, SynthResult};
use crate::model::Manifest;
use crate::pipeline::stages::standard_pipeline;
use crate::pipeline::{Diagnostic, Pipeline, SynthContext};

/// A manifest plus what the run observed on the way.
#[derive(Debug, Clone)]
pub struct SynthesisReport {
    pub manifest: Manifest,
    pub diagnostics: Vec<Diagnostic>,
    pub deployment: Option<DeploymentOutcome>,
}

/// Turns stack declarations into manifests.
#[derive(Debug)]
pub struct Synthesizer {
    config: StackConfig,
    pipeline: Pipeline,
}

impl Synthesizer {
    pub fn new(config: StackConfig) -> SynthResult<Self> {
        validate_config(&config)?;
        Ok(Self {
            config,
            pipeline: standard_pipeline(),
        })
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Synthesize a manifest. Any error aborts; no partial manifest is returned.
    pub fn synthesize(&self, declaration: &StackDeclaration) -> SynthResult<Manifest> {
        self.synthesize_report(declaration).map(|r| r.manifest)
    }

    pub fn synthesize_report(&self, declaration: &StackDeclaration) -> SynthResult<SynthesisReport> {
        let _span = tracing::info_span!("synthesize", stack = %declaration.stack).entered();
        declaration.validate()?;

        let mut ctx = SynthContext::new(declaration, &self.config);
        self.pipeline.run(&mut ctx)?;

        let max = self.config.limits.max_resources;
        if ctx.graph.len() > max {
            return Err(SynthError::invalid_argument(format!(
                "stack declares {} resources, limit is {max}",
                ctx.graph.len()
            )));
        }

        let ordered = ctx.graph.ordered_nodes()?;
        let warnings: Vec<String> = ctx
            .warnings()
            .map(|d| format!("{}: {}", d.code, d.message))
            .collect();
        let manifest = Manifest::new(&declaration.stack, ordered, warnings, self.config.digest)?;

        tracing::info!(
            resources = manifest.ordered_resources.len(),
            warnings = manifest.warnings.len(),
            digest = %manifest.digest,
            "synthesized manifest"
        );

        Ok(SynthesisReport {
            manifest,
            diagnostics: ctx.diagnostics,
            deployment: ctx.deployment.map(|d| d.outcome),
        })
    }
}
