//! Node implementation for the hypergraph
//!
//! A node owns no edges. It keeps back-references, by edge identifier and
//! grouped by edge type id, to every edge that lists it as a directed
//! source, a directed target or an undirected member.

use super::types::{Identifier, TypeId};
use indexmap::IndexSet;
use rustc_hash::FxHashMap;

/// Role a node plays in an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Source,
    Target,
    Member,
}

type EdgeIndex = FxHashMap<TypeId, IndexSet<Identifier>>;

#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier for this node
    pub id: Identifier,

    /// Dense id used to address feature columns
    pub(crate) internal_id: u64,

    source_of: EdgeIndex,
    target_of: EdgeIndex,
    member_of: EdgeIndex,
}

impl Node {
    pub(crate) fn new(id: Identifier, internal_id: u64) -> Self {
        Node {
            id,
            internal_id,
            source_of: EdgeIndex::default(),
            target_of: EdgeIndex::default(),
            member_of: EdgeIndex::default(),
        }
    }

    pub fn internal_id(&self) -> u64 {
        self.internal_id
    }

    fn index(&self, role: Role) -> &EdgeIndex {
        match role {
            Role::Source => &self.source_of,
            Role::Target => &self.target_of,
            Role::Member => &self.member_of,
        }
    }

    fn index_mut(&mut self, role: Role) -> &mut EdgeIndex {
        match role {
            Role::Source => &mut self.source_of,
            Role::Target => &mut self.target_of,
            Role::Member => &mut self.member_of,
        }
    }

    pub(crate) fn attach(&mut self, role: Role, edge: &Identifier) -> bool {
        self.index_mut(role)
            .entry(edge.type_id.clone())
            .or_default()
            .insert(edge.clone())
    }

    pub(crate) fn detach(&mut self, role: Role, edge: &Identifier) -> bool {
        let index = self.index_mut(role);
        let Some(set) = index.get_mut(&edge.type_id) else {
            return false;
        };
        let removed = set.shift_remove(edge);
        if set.is_empty() {
            index.remove(&edge.type_id);
        }
        removed
    }

    /// Edges in which this node plays `role`, optionally restricted to one
    /// edge type
    pub fn edges_in_role(&self, role: Role, edge_type: Option<&TypeId>) -> IndexSet<Identifier> {
        let index = self.index(role);
        match edge_type {
            Some(t) => index.get(t).cloned().unwrap_or_default(),
            None => {
                let mut types: Vec<&TypeId> = index.keys().collect();
                types.sort();
                types.into_iter().flat_map(|t| index[t].iter().cloned()).collect()
            }
        }
    }

    /// Every incident edge regardless of role
    pub fn all_edges(&self, edge_type: Option<&TypeId>) -> IndexSet<Identifier> {
        let mut all = self.edges_in_role(Role::Source, edge_type);
        all.extend(self.edges_in_role(Role::Target, edge_type));
        all.extend(self.edges_in_role(Role::Member, edge_type));
        all
    }

    pub fn plays(&self, role: Role, edge: &Identifier) -> bool {
        self.index(role)
            .get(&edge.type_id)
            .is_some_and(|set| set.contains(edge))
    }

    /// Number of distinct incident edges
    pub fn degree(&self) -> usize {
        self.all_edges(None).len()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::StoreId;

    fn id(type_id: &str, obj: &str) -> Identifier {
        Identifier::new(StoreId::new("G", "g"), type_id, obj)
    }

    #[test]
    fn test_attach_detach() {
        let mut node = Node::new(id("Person", "p1"), 1);
        let e1 = id("Knows", "e1");
        assert!(node.attach(Role::Source, &e1));
        assert!(!node.attach(Role::Source, &e1));
        assert!(node.plays(Role::Source, &e1));
        assert!(!node.plays(Role::Target, &e1));

        assert!(node.detach(Role::Source, &e1));
        assert!(!node.detach(Role::Source, &e1));
        assert_eq!(node.degree(), 0);
    }

    #[test]
    fn test_edges_by_type() {
        let mut node = Node::new(id("Person", "p1"), 1);
        node.attach(Role::Source, &id("Knows", "e1"));
        node.attach(Role::Target, &id("Knows", "e2"));
        node.attach(Role::Member, &id("Friend", "f1"));

        assert_eq!(node.edges_in_role(Role::Source, None).len(), 1);
        assert_eq!(node.all_edges(Some(&TypeId::new("Knows"))).len(), 2);
        assert_eq!(node.all_edges(None).len(), 3);
        assert!(node.edges_in_role(Role::Member, Some(&TypeId::new("Knows"))).is_empty());
    }

    #[test]
    fn test_self_loop_counts_once() {
        let mut node = Node::new(id("Person", "p1"), 1);
        let e = id("Knows", "loop");
        node.attach(Role::Source, &e);
        node.attach(Role::Target, &e);
        assert_eq!(node.degree(), 1);
    }

    #[test]
    fn test_node_equality() {
        let a = Node::new(id("Person", "p1"), 1);
        let b = Node::new(id("Person", "p1"), 7);
        let c = Node::new(id("Person", "p2"), 1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
