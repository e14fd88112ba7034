//! Graph-bound views for incidence and adjacency queries
//!
//! Nodes and edges only hold identifiers. A view pairs an item with the
//! graph that owns it so neighborhoods can be resolved.
//!
//! Type filters name the connecting item: for a node, the `_of` variants
//! filter by edge type; for an edge, by node type.

use super::edge::Edge;
use super::node::{Node, Role};
use super::store::Graph;
use super::types::{Identifier, TypeId};
use indexmap::IndexSet;
use std::ops::Deref;

#[derive(Debug, Clone, Copy)]
pub struct NodeView<'g> {
    graph: &'g Graph,
    node: &'g Node,
}

impl<'g> NodeView<'g> {
    pub(crate) fn new(graph: &'g Graph, node: &'g Node) -> Self {
        NodeView { graph, node }
    }

    pub fn node(&self) -> &'g Node {
        self.node
    }

    /// Incident edges in any role
    pub fn incident(&self) -> IndexSet<Identifier> {
        self.node.all_edges(None)
    }

    pub fn incident_of(&self, edge_type: &TypeId) -> IndexSet<Identifier> {
        self.node.all_edges(Some(edge_type))
    }

    pub fn incident_as_source(&self) -> IndexSet<Identifier> {
        self.node.edges_in_role(Role::Source, None)
    }

    pub fn incident_as_source_of(&self, edge_type: &TypeId) -> IndexSet<Identifier> {
        self.node.edges_in_role(Role::Source, Some(edge_type))
    }

    pub fn incident_as_target(&self) -> IndexSet<Identifier> {
        self.node.edges_in_role(Role::Target, None)
    }

    pub fn incident_as_target_of(&self, edge_type: &TypeId) -> IndexSet<Identifier> {
        self.node.edges_in_role(Role::Target, Some(edge_type))
    }

    pub fn incident_undirected(&self) -> IndexSet<Identifier> {
        self.node.edges_in_role(Role::Member, None)
    }

    pub fn incident_undirected_of(&self, edge_type: &TypeId) -> IndexSet<Identifier> {
        self.node.edges_in_role(Role::Member, Some(edge_type))
    }

    /// Nodes sharing at least one edge with this node, excluding itself
    pub fn adjacent(&self) -> IndexSet<Identifier> {
        self.collect(&self.incident(), Edge::nodes)
    }

    pub fn adjacent_of(&self, edge_type: &TypeId) -> IndexSet<Identifier> {
        self.collect(&self.incident_of(edge_type), Edge::nodes)
    }

    /// Targets of edges this node is a source of
    pub fn adjacent_targets(&self) -> IndexSet<Identifier> {
        self.collect(&self.incident_as_source(), targets)
    }

    pub fn adjacent_targets_of(&self, edge_type: &TypeId) -> IndexSet<Identifier> {
        self.collect(&self.incident_as_source_of(edge_type), targets)
    }

    /// Sources of edges this node is a target of
    pub fn adjacent_sources(&self) -> IndexSet<Identifier> {
        self.collect(&self.incident_as_target(), sources)
    }

    pub fn adjacent_sources_of(&self, edge_type: &TypeId) -> IndexSet<Identifier> {
        self.collect(&self.incident_as_target_of(edge_type), sources)
    }

    /// Co-members of undirected edges
    pub fn adjacent_undirected(&self) -> IndexSet<Identifier> {
        self.collect(&self.incident_undirected(), Edge::nodes)
    }

    pub fn adjacent_undirected_of(&self, edge_type: &TypeId) -> IndexSet<Identifier> {
        self.collect(&self.incident_undirected_of(edge_type), Edge::nodes)
    }

    fn collect<F>(&self, edges: &IndexSet<Identifier>, pick: F) -> IndexSet<Identifier>
    where
        F: Fn(&Edge) -> IndexSet<Identifier>,
    {
        edges
            .iter()
            .filter_map(|e| self.graph.edge_ref(e))
            .flat_map(|e| pick(e))
            .filter(|n| n != &self.node.id)
            .collect()
    }
}

fn sources(edge: &Edge) -> IndexSet<Identifier> {
    edge.as_directed().map(|e| e.sources().clone()).unwrap_or_default()
}

fn targets(edge: &Edge) -> IndexSet<Identifier> {
    edge.as_directed().map(|e| e.targets().clone()).unwrap_or_default()
}

impl Deref for NodeView<'_> {
    type Target = Node;

    fn deref(&self) -> &Node {
        self.node
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EdgeView<'g> {
    graph: &'g Graph,
    edge: &'g Edge,
}

impl<'g> EdgeView<'g> {
    pub(crate) fn new(graph: &'g Graph, edge: &'g Edge) -> Self {
        EdgeView { graph, edge }
    }

    pub fn edge(&self) -> &'g Edge {
        self.edge
    }

    /// Nodes of the edge, sources before targets
    pub fn incident(&self) -> IndexSet<Identifier> {
        self.edge.nodes()
    }

    pub fn incident_of(&self, node_type: &TypeId) -> IndexSet<Identifier> {
        self.edge
            .nodes()
            .into_iter()
            .filter(|n| &n.type_id == node_type)
            .collect()
    }

    /// Edges sharing at least one node with this edge, excluding itself
    pub fn adjacent(&self) -> IndexSet<Identifier> {
        self.neighbors(None)
    }

    pub fn adjacent_of(&self, edge_type: &TypeId) -> IndexSet<Identifier> {
        self.neighbors(Some(edge_type))
    }

    fn neighbors(&self, edge_type: Option<&TypeId>) -> IndexSet<Identifier> {
        self.edge
            .nodes()
            .iter()
            .filter_map(|n| self.graph.node_ref(n))
            .flat_map(|n| n.all_edges(edge_type))
            .filter(|e| e != self.edge.id())
            .collect()
    }
}

impl Deref for EdgeView<'_> {
    type Target = Edge;

    fn deref(&self) -> &Edge {
        self.edge
    }
}

/// Any node or edge, for queries that apply to both
#[derive(Debug, Clone, Copy)]
pub enum GraphItem<'g> {
    Node(NodeView<'g>),
    Edge(EdgeView<'g>),
}

impl<'g> GraphItem<'g> {
    pub fn id(&self) -> &'g Identifier {
        match self {
            GraphItem::Node(n) => &n.node().id,
            GraphItem::Edge(e) => e.edge().id(),
        }
    }

    pub fn is_node(&self) -> bool {
        matches!(self, GraphItem::Node(_))
    }

    pub fn as_node(&self) -> Option<&NodeView<'g>> {
        match self {
            GraphItem::Node(n) => Some(n),
            GraphItem::Edge(_) => None,
        }
    }

    pub fn as_edge(&self) -> Option<&EdgeView<'g>> {
        match self {
            GraphItem::Edge(e) => Some(e),
            GraphItem::Node(_) => None,
        }
    }

    /// Edges of a node, or nodes of an edge
    pub fn incident(&self) -> IndexSet<Identifier> {
        match self {
            GraphItem::Node(n) => n.incident(),
            GraphItem::Edge(e) => e.incident(),
        }
    }

    pub fn incident_of(&self, type_id: &TypeId) -> IndexSet<Identifier> {
        match self {
            GraphItem::Node(n) => n.incident_of(type_id),
            GraphItem::Edge(e) => e.incident_of(type_id),
        }
    }

    /// Items of the same kind sharing an incident item
    pub fn adjacent(&self) -> IndexSet<Identifier> {
        match self {
            GraphItem::Node(n) => n.adjacent(),
            GraphItem::Edge(e) => e.adjacent(),
        }
    }

    /// For a node, the filter is the type of the connecting edge; for an
    /// edge, the type of the adjacent edges
    pub fn adjacent_of(&self, type_id: &TypeId) -> IndexSet<Identifier> {
        match self {
            GraphItem::Node(n) => n.adjacent_of(type_id),
            GraphItem::Edge(e) => e.adjacent_of(type_id),
        }
    }

    pub fn is_incident(&self, other: &Identifier) -> bool {
        match self {
            GraphItem::Node(n) => n.all_edges(Some(&other.type_id)).contains(other),
            GraphItem::Edge(e) => e.contains(other),
        }
    }

    pub fn is_adjacent(&self, other: &Identifier) -> bool {
        self.adjacent().contains(other)
    }

    pub fn degree(&self) -> usize {
        self.incident().len()
    }
}
