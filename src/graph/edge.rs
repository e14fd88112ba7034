//! Hyperedge implementation
//!
//! Edges connect arbitrary non-empty node sets:
//! - directed edges hold separate source and target sets, each non-empty
//! - undirected edges hold one non-empty member set
//!
//! Membership is held by node identifier only; the owning graph resolves
//! identifiers to nodes.

use super::node::Role;
use super::types::Identifier;
use indexmap::IndexSet;

#[derive(Debug, Clone)]
pub struct DirectedEdge {
    pub id: Identifier,
    pub(crate) internal_id: u64,
    pub(crate) sources: IndexSet<Identifier>,
    pub(crate) targets: IndexSet<Identifier>,
}

impl DirectedEdge {
    pub fn sources(&self) -> &IndexSet<Identifier> {
        &self.sources
    }

    pub fn targets(&self) -> &IndexSet<Identifier> {
        &self.targets
    }

    pub fn is_source(&self, node: &Identifier) -> bool {
        self.sources.contains(node)
    }

    pub fn is_target(&self, node: &Identifier) -> bool {
        self.targets.contains(node)
    }

    /// Exact set equality of source nodes
    pub fn has_same_sources(&self, other: &DirectedEdge) -> bool {
        self.sources == other.sources
    }

    /// Exact set equality of target nodes
    pub fn has_same_targets(&self, other: &DirectedEdge) -> bool {
        self.targets == other.targets
    }
}

#[derive(Debug, Clone)]
pub struct UndirectedEdge {
    pub id: Identifier,
    pub(crate) internal_id: u64,
    pub(crate) members: IndexSet<Identifier>,
}

impl UndirectedEdge {
    pub fn members(&self) -> &IndexSet<Identifier> {
        &self.members
    }

    pub fn is_member(&self, node: &Identifier) -> bool {
        self.members.contains(node)
    }

    /// Exact set equality of member nodes
    pub fn has_same_members(&self, other: &UndirectedEdge) -> bool {
        self.members == other.members
    }
}

/// A hyperedge in the graph
#[derive(Debug, Clone)]
pub enum Edge {
    Directed(DirectedEdge),
    Undirected(UndirectedEdge),
}

impl Edge {
    pub(crate) fn directed(
        id: Identifier,
        internal_id: u64,
        sources: IndexSet<Identifier>,
        targets: IndexSet<Identifier>,
    ) -> Self {
        Edge::Directed(DirectedEdge {
            id,
            internal_id,
            sources,
            targets,
        })
    }

    pub(crate) fn undirected(id: Identifier, internal_id: u64, members: IndexSet<Identifier>) -> Self {
        Edge::Undirected(UndirectedEdge {
            id,
            internal_id,
            members,
        })
    }

    pub fn id(&self) -> &Identifier {
        match self {
            Edge::Directed(e) => &e.id,
            Edge::Undirected(e) => &e.id,
        }
    }

    pub fn internal_id(&self) -> u64 {
        match self {
            Edge::Directed(e) => e.internal_id,
            Edge::Undirected(e) => e.internal_id,
        }
    }

    pub fn is_directed(&self) -> bool {
        matches!(self, Edge::Directed(_))
    }

    pub fn as_directed(&self) -> Option<&DirectedEdge> {
        match self {
            Edge::Directed(e) => Some(e),
            Edge::Undirected(_) => None,
        }
    }

    pub fn as_undirected(&self) -> Option<&UndirectedEdge> {
        match self {
            Edge::Undirected(e) => Some(e),
            Edge::Directed(_) => None,
        }
    }

    /// All nodes of the edge, sources before targets
    pub fn nodes(&self) -> IndexSet<Identifier> {
        match self {
            Edge::Directed(e) => e.sources.iter().chain(e.targets.iter()).cloned().collect(),
            Edge::Undirected(e) => e.members.clone(),
        }
    }

    pub fn contains(&self, node: &Identifier) -> bool {
        match self {
            Edge::Directed(e) => e.is_source(node) || e.is_target(node),
            Edge::Undirected(e) => e.is_member(node),
        }
    }

    /// Roles `node` plays in this edge
    pub(crate) fn roles_of(&self, node: &Identifier) -> Vec<Role> {
        let mut roles = Vec::new();
        match self {
            Edge::Directed(e) => {
                if e.is_source(node) {
                    roles.push(Role::Source);
                }
                if e.is_target(node) {
                    roles.push(Role::Target);
                }
            }
            Edge::Undirected(e) => {
                if e.is_member(node) {
                    roles.push(Role::Member);
                }
            }
        }
        roles
    }

    /// Membership set for a role, `None` if the edge variant has no such role
    pub(crate) fn role_set_mut(&mut self, role: Role) -> Option<&mut IndexSet<Identifier>> {
        match (self, role) {
            (Edge::Directed(e), Role::Source) => Some(&mut e.sources),
            (Edge::Directed(e), Role::Target) => Some(&mut e.targets),
            (Edge::Undirected(e), Role::Member) => Some(&mut e.members),
            _ => None,
        }
    }

    /// Edge invariant: at least one source and one target, or at least one
    /// member
    pub fn is_valid(&self) -> bool {
        match self {
            Edge::Directed(e) => !e.sources.is_empty() && !e.targets.is_empty(),
            Edge::Undirected(e) => !e.members.is_empty(),
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Edge {}

impl std::hash::Hash for Edge {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}
