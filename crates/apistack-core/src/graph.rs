//! Resource dependency graph and provisioning-order resolution.
//!
//! The graph owns every node of a synthesis run. Nodes are kept in
//! declaration order; `resolve_order` is a depth-first topological sort with
//! a three-colour marker that visits roots and dependencies in declaration
//! order, so the resulting linearization is reproducible.
//!
//! The graph never mutates a node once inserted.

use std::collections::BTreeMap;

use crate::errors::{SynthError, SynthResult};
use crate::model::{ResourceKind, ResourceNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

struct Frame {
    node: usize,
    deps: Vec<usize>,
    next: usize,
}

/// A set of resource nodes with dependency edges.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    nodes: Vec<ResourceNode>,
    index: BTreeMap<String, usize>,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Fails on a duplicate id or a self-reference.
    pub fn add_node(&mut self, node: ResourceNode) -> SynthResult<()> {
        if self.index.contains_key(&node.id) {
            return Err(SynthError::DuplicateId { id: node.id });
        }
        if node.depends_on.contains(&node.id) {
            return Err(SynthError::Cycle {
                path: vec![node.id.clone(), node.id],
            });
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ResourceNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter()
    }

    pub fn nodes_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceNode> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    /// Check that every `dependsOn` entry names a node of this graph.
    pub fn validate_references(&self) -> SynthResult<()> {
        for n in &self.nodes {
            for dep in &n.depends_on {
                if !self.index.contains_key(dep) {
                    return Err(SynthError::UnknownDependency {
                        from: n.id.clone(),
                        to: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Compute a provisioning order: every node appears after all of its dependencies.
    pub fn resolve_order(&self) -> SynthResult<Vec<String>> {
        self.validate_references()?;

        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        let mut out: Vec<usize> = Vec::with_capacity(self.nodes.len());

        for root in 0..self.nodes.len() {
            if marks[root] == Mark::Unvisited {
                self.visit(root, &mut marks, &mut out)?;
            }
        }

        Ok(out.into_iter().map(|i| self.nodes[i].id.clone()).collect())
    }

    /// Clone the nodes in resolved order.
    pub fn ordered_nodes(&self) -> SynthResult<Vec<ResourceNode>> {
        let order = self.resolve_order()?;
        Ok(order
            .iter()
            .map(|id| self.nodes[self.index[id]].clone())
            .collect())
    }

    /// Dependency indices of `at`, in declaration order rather than lexical id order.
    fn sorted_deps(&self, at: usize) -> Vec<usize> {
        let mut deps: Vec<usize> = self.nodes[at]
            .depends_on
            .iter()
            .map(|d| self.index[d])
            .collect();
        deps.sort_unstable();
        deps
    }

    /// Depth-first walk from `root` on an explicit stack, so chain length is
    /// bounded by heap rather than thread stack.
    fn visit(&self, root: usize, marks: &mut [Mark], out: &mut Vec<usize>) -> SynthResult<()> {
        let mut stack = vec![Frame {
            node: root,
            deps: self.sorted_deps(root),
            next: 0,
        }];
        marks[root] = Mark::InProgress;

        while let Some(frame) = stack.last_mut() {
            let Some(&dep) = frame.deps.get(frame.next) else {
                let at = frame.node;
                stack.pop();
                marks[at] = Mark::Done;
                out.push(at);
                continue;
            };
            frame.next += 1;

            match marks[dep] {
                Mark::Done => {}
                Mark::Unvisited => {
                    marks[dep] = Mark::InProgress;
                    stack.push(Frame {
                        node: dep,
                        deps: self.sorted_deps(dep),
                        next: 0,
                    });
                }
                Mark::InProgress => {
                    let start = stack.iter().position(|f| f.node == dep).unwrap_or(0);
                    let mut path: Vec<String> = stack[start..]
                        .iter()
                        .map(|f| self.nodes[f.node].id.clone())
                        .collect();
                    path.push(self.nodes[dep].id.clone());
                    return Err(SynthError::Cycle { path });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn node(id: &str, deps: &[&str]) -> ResourceNode {
        let mut n = ResourceNode::new(id, ResourceKind::Resource);
        for d in deps {
            n.add_dependency(*d);
        }
        n
    }

    fn graph(nodes: Vec<ResourceNode>) -> ResourceGraph {
        let mut g = ResourceGraph::new();
        for n in nodes {
            g.add_node(n).unwrap();
        }
        g
    }

    #[test]
    fn dependencies_come_first() {
        let g = graph(vec![
            node("stage", &["deployment"]),
            node("deployment", &["method"]),
            node("method", &["gateway"]),
            node("gateway", &[]),
        ]);
        assert_eq!(
            g.resolve_order().unwrap(),
            vec!["gateway", "method", "deployment", "stage"]
        );
    }

    #[test]
    fn independent_nodes_keep_declaration_order() {
        let g = graph(vec![node("zeta", &[]), node("alpha", &[]), node("mid", &[])]);
        assert_eq!(g.resolve_order().unwrap(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn dependency_ties_break_by_declaration_order() {
        let g = graph(vec![
            node("top", &["a", "b"]),
            node("b", &[]),
            node("a", &[]),
        ]);
        assert_eq!(g.resolve_order().unwrap(), vec!["b", "a", "top"]);
    }

    #[test]
    fn duplicate_id_rejected() {
        let mut g = graph(vec![node("a", &[])]);
        let err = g.add_node(node("a", &[])).unwrap_err();
        assert_matches!(err, SynthError::DuplicateId { ref id } if id == "a");
    }

    #[test]
    fn self_reference_rejected() {
        let mut g = ResourceGraph::new();
        let err = g.add_node(node("a", &["a"])).unwrap_err();
        assert_matches!(err, SynthError::Cycle { .. });
    }

    #[test]
    fn cycle_reports_closed_path() {
        let g = graph(vec![node("a", &["b"]), node("b", &["c"]), node("c", &["a"])]);
        let err = g.resolve_order().unwrap_err();
        assert_matches!(err, SynthError::Cycle { ref path } if path == &vec!["a", "b", "c", "a"]);
    }

    #[test]
    fn unknown_dependency_rejected() {
        let g = graph(vec![node("a", &["ghost"])]);
        assert_matches!(
            g.resolve_order().unwrap_err(),
            SynthError::UnknownDependency { ref from, ref to } if from == "a" && to == "ghost"
        );
    }

    #[test]
    fn long_chain_resolves_without_recursion() {
        const N: usize = 100_000;
        let mut g = ResourceGraph::new();
        for i in 0..N {
            let deps: Vec<String> = if i + 1 < N { vec![format!("n{}", i + 1)] } else { vec![] };
            let refs: Vec<&str> = deps.iter().map(String::as_str).collect();
            g.add_node(node(&format!("n{i}"), &refs)).unwrap();
        }
        let order = g.resolve_order().unwrap();
        assert_eq!(order.len(), N);
        assert_eq!(order[0], format!("n{}", N - 1));
        assert_eq!(order[N - 1], "n0");
    }

    #[test]
    fn long_cycle_reports_closed_path() {
        const N: usize = 10_000;
        let mut g = ResourceGraph::new();
        for i in 0..N {
            let next = format!("n{}", (i + 1) % N);
            g.add_node(node(&format!("n{i}"), &[next.as_str()])).unwrap();
        }
        let err = g.resolve_order().unwrap_err();
        assert_matches!(err, SynthError::Cycle { ref path } if path.len() == N + 1 && path[0] == "n0" && path[N] == "n0");
    }

    #[test]
    fn kind_filter_preserves_order() {
        let mut g = ResourceGraph::new();
        g.add_node(ResourceNode::new("m2", ResourceKind::Method)).unwrap();
        g.add_node(ResourceNode::new("gw", ResourceKind::Gateway)).unwrap();
        g.add_node(ResourceNode::new("m1", ResourceKind::Method)).unwrap();
        let ids: Vec<&str> = g
            .nodes_of_kind(ResourceKind::Method)
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m2", "m1"]);
    }
}
