//! Deployment resolution.
//!
//! A gateway is published through exactly one deployment snapshot and one
//! stage. Some backends create a snapshot implicitly when the gateway is
//! declared with auto-deploy; in that case the resolver adopts it instead of
//! emitting a second deployment.
//!
//! The resolver is a small state machine:
//!
//! ```text
//! Checking --(implicit snapshot found)--> Reuse  --> Bound
//!          \--(no snapshot)-------------> Create --> Bound
//! ```
//!
//! Every transition is recorded in the returned [`DeploymentResolution`].

use std::fmt;

use serde::Serialize;

use crate::config::HashAlgorithm;
use crate::determinism::hashing::hash_canonical_hex;
use crate::domain;
use crate::errors::{SynthError, SynthResult};
use crate::graph::ResourceGraph;
use crate::model::{ids, ResourceKind, ResourceNode};

/// Property marking a deployment created implicitly by the gateway.
pub const IMPLICIT_PROPERTY: &str = "implicit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeploymentState {
    Checking,
    Reuse,
    Create,
    Bound,
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeploymentState::Checking => "checking",
            DeploymentState::Reuse => "reuse",
            DeploymentState::Create => "create",
            DeploymentState::Bound => "bound",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentOutcome {
    /// An implicit snapshot was adopted.
    Reused { deployment_id: String },
    /// A new deployment node was emitted.
    Created { deployment_id: String },
}

impl DeploymentOutcome {
    pub fn deployment_id(&self) -> &str {
        match self {
            DeploymentOutcome::Reused { deployment_id } | DeploymentOutcome::Created { deployment_id } => {
                deployment_id
            }
        }
    }
}

/// Result of one resolver run.
#[derive(Debug, Clone)]
pub struct DeploymentResolution {
    pub outcome: DeploymentOutcome,
    /// The new deployment node. `None` when an implicit snapshot was reused.
    pub deployment: Option<ResourceNode>,
    pub stage: ResourceNode,
    pub transitions: Vec<DeploymentState>,
}

impl DeploymentResolution {
    pub fn final_state(&self) -> DeploymentState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(DeploymentState::Checking)
    }
}

/// Decides whether a gateway's deployment is reused or created and binds a stage to it.
#[derive(Debug)]
pub struct DeploymentResolver<'g> {
    graph: &'g ResourceGraph,
    gateway_id: String,
    hash: HashAlgorithm,
    transitions: Vec<DeploymentState>,
}

impl<'g> DeploymentResolver<'g> {
    pub fn new(graph: &'g ResourceGraph, gateway_id: impl Into<String>, hash: HashAlgorithm) -> Self {
        Self {
            graph,
            gateway_id: gateway_id.into(),
            hash,
            transitions: Vec::new(),
        }
    }

    /// Run the state machine to completion.
    ///
    /// `created_at` is the logical version stamped on a newly created deployment.
    pub fn resolve(mut self, stage_name: &str, created_at: u64) -> SynthResult<DeploymentResolution> {
        if stage_name.trim().is_empty() {
            return Err(SynthError::invalid_argument("stage name must not be empty"));
        }

        self.enter(DeploymentState::Checking);
        let methods = self.gateway_methods();
        if methods.is_empty() {
            return Err(SynthError::NoMethodsDeployed {
                gateway: self.gateway_id.clone(),
            });
        }

        let (outcome, deployment) = match self.find_snapshot() {
            Some(snapshot) => {
                self.enter(DeploymentState::Reuse);
                self.check_snapshot_current(snapshot, &methods)?;
                let outcome = DeploymentOutcome::Reused {
                    deployment_id: snapshot.id.clone(),
                };
                (outcome, None)
            }
            None => {
                self.enter(DeploymentState::Create);
                let node = self.create_deployment(&methods, created_at)?;
                let outcome = DeploymentOutcome::Created {
                    deployment_id: node.id.clone(),
                };
                (outcome, Some(node))
            }
        };

        let deployment_id = outcome.deployment_id().to_string();
        let stage = ResourceNode::new(ids::stage(&self.gateway_id, stage_name), ResourceKind::Stage)
            .with_property("name", stage_name)
            .with_property("deploymentRef", deployment_id.clone())
            .with_property("restApiRef", self.gateway_id.clone())
            .depends_on(deployment_id);
        self.enter(DeploymentState::Bound);

        Ok(DeploymentResolution {
            outcome,
            deployment,
            stage,
            transitions: self.transitions,
        })
    }

    fn enter(&mut self, state: DeploymentState) {
        tracing::trace!(gateway = %self.gateway_id, %state, "deployment resolver transition");
        self.transitions.push(state);
    }

    fn gateway_methods(&self) -> Vec<&'g ResourceNode> {
        methods_of(self.graph, &self.gateway_id)
    }

    fn find_snapshot(&self) -> Option<&'g ResourceNode> {
        let gateway = self.gateway_id.as_str();
        self.graph.nodes_of_kind(ResourceKind::Deployment).find(|d| {
            d.property_bool(IMPLICIT_PROPERTY) == Some(true) && d.property_str("apiRef") == Some(gateway)
        })
    }

    fn check_snapshot_current(&self, snapshot: &ResourceNode, methods: &[&ResourceNode]) -> SynthResult<()> {
        if let Some(missing) = methods.iter().find(|m| !snapshot.depends_on.contains(&m.id)) {
            return Err(SynthError::invariant(format!(
                "implicit deployment {} does not cover method {}",
                snapshot.id, missing.id
            )));
        }
        let current = description_hash(self.hash, methods)?;
        if snapshot.property_str("descriptionHash") != Some(current.as_str()) {
            return Err(SynthError::invariant(format!(
                "implicit deployment {} was taken from a different method set",
                snapshot.id
            )));
        }
        Ok(())
    }

    fn create_deployment(&self, methods: &[&ResourceNode], created_at: u64) -> SynthResult<ResourceNode> {
        let description_hash = description_hash(self.hash, methods)?;
        let mut node = ResourceNode::new(ids::deployment(&self.gateway_id), ResourceKind::Deployment)
            .with_property("apiRef", self.gateway_id.clone())
            .with_property("description", format!("deployment of {}", self.gateway_id))
            .with_property("descriptionHash", description_hash)
            .with_property("createdAt", created_at);
        for m in methods {
            node.add_dependency(m.id.clone());
        }
        Ok(node)
    }
}

fn methods_of<'g>(graph: &'g ResourceGraph, gateway_id: &str) -> Vec<&'g ResourceNode> {
    graph
        .nodes_of_kind(ResourceKind::Method)
        .filter(|m| m.property_str("restApiRef") == Some(gateway_id))
        .collect()
}

/// Hex digest of the canonical JSON of a gateway's method nodes.
fn description_hash(hash: HashAlgorithm, methods: &[&ResourceNode]) -> SynthResult<String> {
    hash_canonical_hex(hash, domain::DEPLOYMENT, &methods)
}

/// Build the implicit snapshot a gateway with auto-deploy produces.
///
/// The snapshot depends on every method of the gateway already in `graph`
/// and carries the same `descriptionHash` an explicit deployment of those
/// methods would.
pub fn implicit_snapshot(
    graph: &ResourceGraph,
    gateway_id: &str,
    hash: HashAlgorithm,
    created_at: u64,
) -> SynthResult<ResourceNode> {
    let methods = methods_of(graph, gateway_id);
    let mut node = ResourceNode::new(ids::latest_deployment(gateway_id), ResourceKind::Deployment)
        .with_property("apiRef", gateway_id)
        .with_property("descriptionHash", description_hash(hash, &methods)?)
        .with_property("createdAt", created_at)
        .with_property(IMPLICIT_PROPERTY, true);
    for m in methods {
        node.add_dependency(m.id.clone());
    }
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn graph_with_methods(n: usize) -> ResourceGraph {
        let mut g = ResourceGraph::new();
        g.add_node(ResourceNode::new("gw", ResourceKind::Gateway)).unwrap();
        for i in 0..n {
            g.add_node(
                ResourceNode::new(format!("gw/method/m{i}/GET"), ResourceKind::Method)
                    .with_property("restApiRef", "gw")
                    .depends_on("gw"),
            )
            .unwrap();
        }
        g
    }

    #[test]
    fn creates_when_no_snapshot() {
        let g = graph_with_methods(2);
        let r = DeploymentResolver::new(&g, "gw", HashAlgorithm::Sha256)
            .resolve("dev", 1)
            .unwrap();

        assert_matches!(r.outcome, DeploymentOutcome::Created { .. });
        assert_eq!(
            r.transitions,
            vec![DeploymentState::Checking, DeploymentState::Create, DeploymentState::Bound]
        );
        let d = r.deployment.as_ref().unwrap();
        assert_eq!(d.depends_on.len(), 2);
        assert_eq!(d.property("createdAt").unwrap(), 1);
        assert_eq!(r.stage.property_str("deploymentRef"), Some(d.id.as_str()));
        assert!(r.stage.depends_on.contains(&d.id));
    }

    #[test]
    fn reuses_implicit_snapshot() {
        let mut g = graph_with_methods(2);
        let snapshot = implicit_snapshot(&g, "gw", HashAlgorithm::Sha256, 1).unwrap();
        g.add_node(snapshot).unwrap();

        let r = DeploymentResolver::new(&g, "gw", HashAlgorithm::Sha256)
            .resolve("dev", 1)
            .unwrap();
        assert!(r.deployment.is_none());
        assert_eq!(r.outcome.deployment_id(), "gw/latest-deployment");
        assert_eq!(r.final_state(), DeploymentState::Bound);
        assert!(r.transitions.contains(&DeploymentState::Reuse));
    }

    #[test]
    fn stale_snapshot_is_an_invariant_violation() {
        let mut g = graph_with_methods(1);
        g.add_node(implicit_snapshot(&g, "gw", HashAlgorithm::Sha256, 1).unwrap()).unwrap();
        g.add_node(
            ResourceNode::new("gw/method/late/POST", ResourceKind::Method)
                .with_property("restApiRef", "gw"),
        )
        .unwrap();

        let err = DeploymentResolver::new(&g, "gw", HashAlgorithm::Sha256)
            .resolve("dev", 1)
            .unwrap_err();
        assert_matches!(err, SynthError::Invariant(_));
    }

    #[test]
    fn no_methods_fails() {
        let g = graph_with_methods(0);
        let err = DeploymentResolver::new(&g, "gw", HashAlgorithm::Sha256)
            .resolve("dev", 1)
            .unwrap_err();
        assert_matches!(err, SynthError::NoMethodsDeployed { ref gateway } if gateway == "gw");
    }

    #[test]
    fn snapshot_hash_matches_explicit_deployment() {
        let g = graph_with_methods(2);
        let snapshot = implicit_snapshot(&g, "gw", HashAlgorithm::Sha256, 7).unwrap();
        let created = DeploymentResolver::new(&g, "gw", HashAlgorithm::Sha256)
            .resolve("dev", 1)
            .unwrap();
        let explicit = created.deployment.unwrap();
        assert_eq!(snapshot.property("createdAt").unwrap(), 7);
        assert_eq!(
            snapshot.property_str("descriptionHash"),
            explicit.property_str("descriptionHash")
        );
    }

    #[test]
    fn snapshot_with_foreign_hash_is_an_invariant_violation() {
        let mut g = graph_with_methods(1);
        let mut snapshot = implicit_snapshot(&g, "gw", HashAlgorithm::Sha256, 1).unwrap();
        snapshot.properties.insert("descriptionHash".into(), "00".into());
        g.add_node(snapshot).unwrap();
        let err = DeploymentResolver::new(&g, "gw", HashAlgorithm::Sha256)
            .resolve("dev", 2)
            .unwrap_err();
        assert_matches!(err, SynthError::Invariant(_));
    }

    #[test]
    fn description_hash_tracks_methods() {
        let a = DeploymentResolver::new(&graph_with_methods(1), "gw", HashAlgorithm::Sha256)
            .resolve("dev", 1)
            .unwrap();
        let b = DeploymentResolver::new(&graph_with_methods(2), "gw", HashAlgorithm::Sha256)
            .resolve("dev", 1)
            .unwrap();
        let hash = |r: &DeploymentResolution| {
            r.deployment
                .as_ref()
                .and_then(|d| d.property_str("descriptionHash"))
                .map(str::to_string)
        };
        assert_ne!(hash(&a), hash(&b));
    }
}
