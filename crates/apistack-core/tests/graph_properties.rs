//! graph_properties.rs
//!
//! Property tests for provisioning-order resolution over random DAGs.

use std::collections::HashMap;

use apistack_core::prelude::*;
use proptest::prelude::*;

/// Random DAG: node `i` may only depend on nodes with a smaller index.
fn dag() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..24).prop_flat_map(|n| {
        (0..n)
            .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(4)))
            .collect::<Vec<_>>()
    })
}

fn build(edges: &[Vec<usize>], reverse: bool) -> ResourceGraph {
    let n = edges.len();
    let order: Vec<usize> = if reverse { (0..n).rev().collect() } else { (0..n).collect() };
    let mut g = ResourceGraph::new();
    for i in order {
        let mut node = ResourceNode::new(format!("n{i}"), ResourceKind::Resource);
        for d in &edges[i] {
            node.add_dependency(format!("n{d}"));
        }
        g.add_node(node).unwrap();
    }
    g
}

proptest! {
    #[test]
    fn order_respects_every_edge(edges in dag(), reverse in any::<bool>()) {
        let g = build(&edges, reverse);
        let order = g.resolve_order().unwrap();
        prop_assert_eq!(order.len(), edges.len());

        let pos: HashMap<&str, usize> = order.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
        for n in g.iter() {
            for d in &n.depends_on {
                prop_assert!(pos[d.as_str()] < pos[n.id.as_str()]);
            }
        }
    }

    #[test]
    fn order_is_reproducible(edges in dag()) {
        let a = build(&edges, false).resolve_order().unwrap();
        let b = build(&edges, false).resolve_order().unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn back_edge_is_a_cycle(edges in dag()) {
        prop_assume!(edges.len() >= 2);
        let last = edges.len() - 1;
        let mut with_back = edges.clone();
        // n0 -> n{last} -> n0
        with_back[last].push(0);
        with_back[0].push(last);

        let g = build(&with_back, false);
        let err = g.resolve_order().unwrap_err();
        match err {
            SynthError::Cycle { path } => {
                prop_assert!(path.len() >= 3);
                prop_assert_eq!(path.first(), path.last());
            }
            other => prop_assert!(false, "unexpected error {}", other),
        }
    }
}
