//! Randomized structural invariants
//!
//! After any sequence of operations, successful or not:
//! - every edge satisfies its membership invariant
//! - edge membership and node back-references agree in both directions
//! - every referenced item still exists
//! - removing a node deletes exactly the incident edges it leaves empty

use hyperstore::graph::{DeclaredSchema, Edge, Graph, Identifier, Role};
use std::collections::BTreeSet;
use proptest::prelude::*;

const NODES: usize = 6;
const EDGES: usize = 6;

#[derive(Debug, Clone)]
enum Op {
    AddNode(usize),
    AddDirected(usize, Vec<usize>, Vec<usize>),
    AddUndirected(usize, Vec<usize>),
    RemoveNode(usize),
    RemoveNodeWithEdges(usize),
    RemoveEdge(usize),
    AddSource(usize, usize),
    RemoveSource(usize, usize),
    RemoveTarget(usize, usize),
    AddMember(usize, usize),
    RemoveMember(usize, usize),
}

fn arb_nodes() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(0..NODES, 0..4)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..NODES).prop_map(Op::AddNode),
        2 => (0..EDGES, arb_nodes(), arb_nodes()).prop_map(|(e, s, t)| Op::AddDirected(e, s, t)),
        2 => (0..EDGES, arb_nodes()).prop_map(|(e, m)| Op::AddUndirected(e, m)),
        1 => (0..NODES).prop_map(Op::RemoveNode),
        1 => (0..NODES).prop_map(Op::RemoveNodeWithEdges),
        1 => (0..EDGES).prop_map(Op::RemoveEdge),
        1 => (0..EDGES, 0..NODES).prop_map(|(e, n)| Op::AddSource(e, n)),
        1 => (0..EDGES, 0..NODES).prop_map(|(e, n)| Op::RemoveSource(e, n)),
        1 => (0..EDGES, 0..NODES).prop_map(|(e, n)| Op::RemoveTarget(e, n)),
        1 => (0..EDGES, 0..NODES).prop_map(|(e, n)| Op::AddMember(e, n)),
        1 => (0..EDGES, 0..NODES).prop_map(|(e, n)| Op::RemoveMember(e, n)),
    ]
}

fn graph() -> Graph {
    let mut g = Graph::new("Test", "g").unwrap();
    g.add_schema("N", DeclaredSchema::node()).unwrap();
    g.add_schema("D", DeclaredSchema::directed()).unwrap();
    g.add_schema("U", DeclaredSchema::undirected()).unwrap();
    g
}

fn node(g: &Graph, i: usize) -> Identifier {
    g.id_for("N", format!("n{}", i))
}

fn directed(g: &Graph, i: usize) -> Identifier {
    g.id_for("D", format!("d{}", i))
}

fn undirected(g: &Graph, i: usize) -> Identifier {
    g.id_for("U", format!("u{}", i))
}

fn nodes(g: &Graph, idx: &[usize]) -> Vec<Identifier> {
    idx.iter().map(|i| node(g, *i)).collect()
}

// Results are ignored: failures must leave the graph consistent too
fn apply(g: &mut Graph, op: &Op) {
    let _ = match op {
        Op::AddNode(i) => g.add_node(node(g, *i)).map(drop),
        Op::AddDirected(e, s, t) => {
            let (id, s, t) = (directed(g, *e), nodes(g, s), nodes(g, t));
            g.add_directed_edge(id, s, t).map(drop)
        }
        Op::AddUndirected(e, m) => {
            let (id, m) = (undirected(g, *e), nodes(g, m));
            g.add_undirected_edge(id, m).map(drop)
        }
        Op::RemoveNode(i) => g.remove_node(&node(g, *i)),
        Op::RemoveNodeWithEdges(i) => g.remove_node_with_edges(&node(g, *i)),
        Op::RemoveEdge(e) => {
            let id = if e % 2 == 0 { directed(g, *e) } else { undirected(g, *e) };
            g.remove_edge(&id)
        }
        Op::AddSource(e, n) => g.add_source(&directed(g, *e), node(g, *n)),
        Op::RemoveSource(e, n) => g.remove_source(&directed(g, *e), &node(g, *n)).map(drop),
        Op::RemoveTarget(e, n) => g.remove_target(&directed(g, *e), &node(g, *n)).map(drop),
        Op::AddMember(e, n) => g.add_member(&undirected(g, *e), node(g, *n)),
        Op::RemoveMember(e, n) => g.remove_member(&undirected(g, *e), &node(g, *n)).map(drop),
    };
}

fn check_consistency(g: &Graph) -> Result<(), TestCaseError> {
    for edge in g.edges() {
        prop_assert!(edge.is_valid(), "edge {} violates membership invariant", edge.id());
        for n in edge.nodes() {
            let node = g.get_node(&n);
            prop_assert!(node.is_ok(), "edge {} references missing node {}", edge.id(), n);
            let node = node.unwrap();
            match edge {
                Edge::Directed(d) => {
                    prop_assert_eq!(d.is_source(&n), node.plays(Role::Source, edge.id()));
                    prop_assert_eq!(d.is_target(&n), node.plays(Role::Target, edge.id()));
                }
                Edge::Undirected(_) => prop_assert!(node.plays(Role::Member, edge.id())),
            }
        }
    }

    for node in g.nodes() {
        for (role, edges) in [
            (Role::Source, node.edges_in_role(Role::Source, None)),
            (Role::Target, node.edges_in_role(Role::Target, None)),
            (Role::Member, node.edges_in_role(Role::Member, None)),
        ] {
            for e in edges {
                let edge = g.get_edge(&e);
                prop_assert!(edge.is_ok(), "node {} references missing edge {}", node.id, e);
                let holds = match (edge.unwrap(), role) {
                    (Edge::Directed(d), Role::Source) => d.is_source(&node.id),
                    (Edge::Directed(d), Role::Target) => d.is_target(&node.id),
                    (Edge::Undirected(u), Role::Member) => u.is_member(&node.id),
                    _ => false,
                };
                prop_assert!(holds, "node {} claims {:?} in {} but the edge disagrees", node.id, role, e);
            }
        }
    }

    prop_assert_eq!(g.node_ids().len(), g.num_nodes());
    prop_assert_eq!(g.edge_ids().len(), g.num_edges());
    Ok(())
}

/// Incident edges of `node` split by whether removing it would empty them
fn split_incident(g: &Graph, node: &Identifier) -> (BTreeSet<String>, BTreeSet<String>) {
    let mut emptied = BTreeSet::new();
    let mut kept = BTreeSet::new();
    for edge in g.edges().into_iter().filter(|e| e.contains(node)) {
        let empties = match edge {
            Edge::Directed(d) => {
                d.sources().iter().all(|n| n == node) || d.targets().iter().all(|n| n == node)
            }
            Edge::Undirected(u) => u.members().iter().all(|n| n == node),
        };
        let key = edge.id().to_string();
        if empties {
            emptied.insert(key);
        } else {
            kept.insert(key);
        }
    }
    (emptied, kept)
}

proptest! {
    #[test]
    fn test_node_removal_deletes_exactly_emptied_edges(
        ops in prop::collection::vec(arb_op(), 1..40),
        victim in 0..NODES,
    ) {
        let mut g = graph();
        for op in &ops {
            apply(&mut g, op);
        }
        let id = node(&g, victim);
        prop_assume!(g.has_node(&id));
        let (emptied, kept) = split_incident(&g, &id);
        let untouched = g.num_edges() - emptied.len() - kept.len();

        g.remove_node(&id).unwrap();

        for e in g.edges() {
            let key = e.id().to_string();
            prop_assert!(!emptied.contains(&key), "edge {} should have been removed", key);
            prop_assert!(!e.contains(&id));
        }
        let survivors: BTreeSet<String> = g.edges().iter().map(|e| e.id().to_string()).collect();
        prop_assert!(kept.is_subset(&survivors), "an edge that still had members was removed");
        prop_assert_eq!(g.num_edges(), kept.len() + untouched);
        check_consistency(&g)?;
    }

    #[test]
    fn test_random_operations_keep_graph_consistent(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut g = graph();
        for op in &ops {
            apply(&mut g, op);
            check_consistency(&g)?;
        }
    }

    #[test]
    fn test_copy_preserves_structure(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut g = graph();
        for op in &ops {
            apply(&mut g, op);
        }
        let copy = g.copy("copy").unwrap();
        check_consistency(&copy)?;
        prop_assert_eq!(copy.num_nodes(), g.num_nodes());
        prop_assert_eq!(copy.num_edges(), g.num_edges());
        for edge in g.edges() {
            let twin = copy.get_edge(&edge.id().with_store(copy.store_id())).unwrap();
            let original: Vec<_> = edge.nodes().iter().map(|n| n.object_id.clone()).collect();
            let copied: Vec<_> = twin.nodes().iter().map(|n| n.object_id.clone()).collect();
            prop_assert_eq!(original, copied);
        }
    }

    #[test]
    fn test_removing_every_node_leaves_no_edges(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut g = graph();
        for op in &ops {
            apply(&mut g, op);
        }
        g.remove_all_nodes().unwrap();
        prop_assert_eq!(g.num_nodes(), 0);
        prop_assert_eq!(g.num_edges(), 0);
    }
}
