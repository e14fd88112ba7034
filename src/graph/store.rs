//! In-memory hypergraph storage implementation
//!
//! The [`Graph`] exclusively owns its nodes, edges, schemas and system data.
//! Items refer to each other only by [`Identifier`]; every cross-reference is
//! resolved through the graph, so removing an item is a matter of updating
//! indices.

use super::edge::Edge;
use super::event::{GraphEvent, GraphListener, ListenerId, ListenerList};
use super::feature::{FeatureDecl, FeatureInput, FeatureValue, ValueKind};
use super::item::{EdgeView, GraphItem, NodeView};
use super::node::{Node, Role};
use super::registry::SchemaRegistry;
use super::schema::{DeclaredSchema, SchemaKind, StoredFeature};
use super::system_data::SystemData;
use super::types::{Identifier, StoreId, TypeId};
use crate::config::StoreConfig;
use indexmap::{IndexMap, IndexSet};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

/// Errors that can occur during graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Item {0} already exists")]
    DuplicateId(Identifier),

    #[error("Item {0} not found")]
    UnknownId(Identifier),

    #[error("Schema {0} not found")]
    UnknownSchema(TypeId),

    #[error("Schema {0} already exists")]
    DuplicateSchema(TypeId),

    #[error("Invalid type id '{0}'")]
    InvalidTypeId(String),

    #[error("Schema {type_id} is {actual}, expected {expected}")]
    WrongSchemaKind {
        type_id: TypeId,
        expected: SchemaKind,
        actual: SchemaKind,
    },

    #[error("Schema {type_id} is {actual}, expected an edge schema")]
    NotAnEdgeSchema { type_id: TypeId, actual: SchemaKind },

    #[error("Edge {0} needs at least one source and one target, or one member")]
    EmptyMembership(Identifier),

    #[error("Node {node} already has that role in edge {edge}")]
    DuplicateMembership { edge: Identifier, node: Identifier },

    #[error("Node {node} does not have that role in edge {edge}")]
    NotAMember { edge: Identifier, node: Identifier },

    #[error("{0} does not belong to this graph")]
    NotInGraph(Identifier),

    #[error("Feature '{feature}' expects {expected}: {reason}")]
    TypeMismatch {
        feature: String,
        expected: ValueKind,
        reason: String,
    },

    #[error("Feature '{feature}' is not declared in schema {type_id}")]
    FeatureNotDeclared { type_id: TypeId, feature: String },

    #[error("Feature '{feature}' is derived and cannot be written")]
    NotSettable { feature: String },

    #[error("Feature '{feature}' of {item} is already unknown")]
    ValueAlreadyUnknown { item: Identifier, feature: String },

    #[error("Schema {0} is reserved for the graph itself")]
    ReservedGraphSchema(TypeId),

    #[error("Graph has been destroyed")]
    Destroyed,

    #[error("Unsupported variant: {0}")]
    UnsupportedVariant(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

/// Typed in-memory hypergraph
///
/// Uses per-type insertion-ordered maps:
/// - nodes: TypeId -> object id -> Node
/// - edges: TypeId -> object id -> Edge
///
/// Mutation takes `&mut self`, so there is a single writer at any time;
/// readers share `&self` and may run on several threads.
#[derive(Debug)]
pub struct Graph {
    id: Identifier,

    /// Internal id of the graph itself, for graph-level features
    internal_id: u64,

    config: StoreConfig,

    schemas: SchemaRegistry,

    nodes: FxHashMap<TypeId, IndexMap<String, Node>>,

    edges: FxHashMap<TypeId, IndexMap<String, Edge>>,

    system_data: SystemData,

    listeners: ListenerList,

    /// Next internal id; never reused
    next_internal_id: AtomicU64,

    destroyed: bool,
}

impl Graph {
    /// Create a graph with default configuration.
    ///
    /// `type_id` becomes the graph's own schema, registered automatically.
    pub fn new(type_id: impl Into<TypeId>, object_id: impl Into<String>) -> GraphResult<Self> {
        Self::with_config(type_id, object_id, StoreConfig::default())
    }

    pub fn with_config(
        type_id: impl Into<TypeId>,
        object_id: impl Into<String>,
        config: StoreConfig,
    ) -> GraphResult<Self> {
        let pattern = Regex::new(&config.type_id_pattern)
            .map_err(|e| GraphError::InvalidConfig(e.to_string()))?;
        let type_id = type_id.into();
        let store = StoreId::new(type_id.clone(), object_id);
        let id = Identifier::new(store.clone(), type_id.clone(), store.object_id);

        let mut schemas = SchemaRegistry::new(pattern);
        schemas.add(type_id, DeclaredSchema::new(SchemaKind::Graph))?;

        Ok(Graph {
            id,
            internal_id: 0,
            config,
            schemas,
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            system_data: SystemData::new(),
            listeners: ListenerList::new(),
            next_internal_id: AtomicU64::new(1),
            destroyed: false,
        })
    }

    /// Identifier of the graph itself
    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn store_id(&self) -> &StoreId {
        &self.id.store
    }

    pub fn graph_type_id(&self) -> &TypeId {
        &self.id.type_id
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Build an identifier that lives in this graph
    pub fn id_for(&self, type_id: impl Into<TypeId>, object_id: impl Into<String>) -> Identifier {
        Identifier::new(self.id.store.clone(), type_id, object_id)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    fn ensure_live(&self) -> GraphResult<()> {
        if self.destroyed {
            return Err(GraphError::Destroyed);
        }
        Ok(())
    }

    fn ensure_owned(&self, id: &Identifier) -> GraphResult<()> {
        if id.store != self.id.store {
            return Err(GraphError::NotInGraph(id.clone()));
        }
        Ok(())
    }

    fn alloc_internal_id(&self) -> u64 {
        self.next_internal_id.fetch_add(1, Ordering::Relaxed)
    }

    fn notify(&self, event: GraphEvent) {
        self.listeners.dispatch(&event);
    }

    // ============================================================
    // Schemas
    // ============================================================

    pub fn add_schema(&mut self, type_id: impl Into<TypeId>, schema: DeclaredSchema) -> GraphResult<()> {
        self.ensure_live()?;
        let type_id = type_id.into();
        if schema.kind() == SchemaKind::Graph {
            return Err(GraphError::ReservedGraphSchema(type_id));
        }
        self.schemas.add(type_id, schema)
    }

    /// Replace a schema's declaration.
    ///
    /// Stored values survive for features whose value kind and category
    /// configuration are unchanged; all derived caches of the schema are
    /// dropped.
    pub fn replace_schema(&mut self, type_id: &TypeId, schema: DeclaredSchema) -> GraphResult<()> {
        self.ensure_live()?;
        self.schemas.replace(type_id, schema)
    }

    /// Same as [`Graph::replace_schema`]
    pub fn update_schema(&mut self, type_id: &TypeId, schema: DeclaredSchema) -> GraphResult<()> {
        self.replace_schema(type_id, schema)
    }

    /// Declare one more feature (or redeclare an existing one)
    pub fn add_feature(&mut self, type_id: &TypeId, name: &str, decl: FeatureDecl) -> GraphResult<()> {
        let mut schema = self.get_schema(type_id)?;
        schema.add_feature(name, decl);
        self.replace_schema(type_id, schema)
    }

    pub fn remove_feature(&mut self, type_id: &TypeId, name: &str) -> GraphResult<()> {
        let mut schema = self.get_schema(type_id)?;
        if schema.remove_feature(name).is_none() {
            return Err(GraphError::FeatureNotDeclared {
                type_id: type_id.clone(),
                feature: name.to_string(),
            });
        }
        self.replace_schema(type_id, schema)
    }

    /// Remove a schema and, first, every item of that type
    pub fn remove_schema(&mut self, type_id: &TypeId) -> GraphResult<()> {
        self.ensure_live()?;
        if type_id == self.graph_type_id() {
            return Err(GraphError::ReservedGraphSchema(type_id.clone()));
        }
        match self.schemas.kind(type_id)? {
            SchemaKind::Node => self.remove_all_nodes_of(type_id)?,
            SchemaKind::DirectedEdge | SchemaKind::UndirectedEdge => self.remove_all_edges_of(type_id)?,
            SchemaKind::Graph => return Err(GraphError::ReservedGraphSchema(type_id.clone())),
        }
        self.nodes.remove(type_id);
        self.edges.remove(type_id);
        self.schemas.remove(type_id);
        debug!(type_id = %type_id, "schema removed");
        Ok(())
    }

    /// Snapshot of a schema declaration
    pub fn get_schema(&self, type_id: &TypeId) -> GraphResult<DeclaredSchema> {
        self.ensure_live()?;
        self.schemas.declared(type_id).cloned()
    }

    pub fn get_schema_kind(&self, type_id: &TypeId) -> GraphResult<SchemaKind> {
        self.ensure_live()?;
        self.schemas.kind(type_id)
    }

    pub fn has_schema(&self, type_id: &TypeId) -> bool {
        self.schemas.contains(type_id)
    }

    pub fn schema_ids(&self) -> Vec<TypeId> {
        self.schemas.ids()
    }

    pub fn schema_ids_of(&self, kind: SchemaKind) -> Vec<TypeId> {
        self.schemas.ids_of(kind)
    }

    /// Same type ids with equal declarations
    pub fn has_same_schemas(&self, other: &Graph) -> bool {
        self.schemas.len() == other.schemas.len()
            && self
                .schemas
                .declarations()
                .all(|(id, decl)| other.schemas.declared(id).is_ok_and(|o| o == decl))
    }

    // ============================================================
    // Structure: nodes
    // ============================================================

    /// Add a node; its schema must exist and be of node kind
    pub fn add_node(&mut self, id: Identifier) -> GraphResult<Identifier> {
        self.ensure_live()?;
        self.ensure_owned(&id)?;
        self.schemas.expect_kind(&id.type_id, SchemaKind::Node)?;
        if self.has_node(&id) {
            return Err(GraphError::DuplicateId(id));
        }

        let internal_id = self.alloc_internal_id();
        let capacity = self.config.initial_node_capacity;
        self.nodes
            .entry(id.type_id.clone())
            .or_insert_with(|| IndexMap::with_capacity(capacity))
            .insert(id.object_id.clone(), Node::new(id.clone(), internal_id));

        debug!(node = %id, internal_id, "node added");
        self.notify(GraphEvent::NodeAdded(id.clone()));
        Ok(id)
    }

    pub fn get_node(&self, id: &Identifier) -> GraphResult<&Node> {
        self.ensure_live()?;
        self.ensure_owned(id)?;
        self.node_ref(id).ok_or_else(|| GraphError::UnknownId(id.clone()))
    }

    pub(crate) fn node_ref(&self, id: &Identifier) -> Option<&Node> {
        self.nodes.get(&id.type_id)?.get(&id.object_id)
    }

    fn node_mut(&mut self, id: &Identifier) -> Option<&mut Node> {
        self.nodes.get_mut(&id.type_id)?.get_mut(&id.object_id)
    }

    pub fn has_node(&self, id: &Identifier) -> bool {
        id.store == self.id.store && self.node_ref(id).is_some()
    }

    /// Remove a node.
    ///
    /// The node is dropped from every incident edge; edges left without
    /// sources, targets or members are removed too, and their
    /// `EdgeRemoved` events precede the final `NodeRemoved`.
    pub fn remove_node(&mut self, id: &Identifier) -> GraphResult<()> {
        self.ensure_live()?;
        let node = self.get_node(id)?;
        let internal_id = node.internal_id;
        let incident = node.all_edges(None);

        self.schemas.storage_mut(&id.type_id)?.strip_item(internal_id);

        let mut invalidated = Vec::new();
        for edge_id in &incident {
            if let Some(edge) = self.edge_mut(edge_id) {
                for role in edge.roles_of(id) {
                    if let Some(set) = edge.role_set_mut(role) {
                        set.shift_remove(id);
                    }
                }
                if !edge.is_valid() {
                    invalidated.push(edge_id.clone());
                }
            }
        }
        for edge_id in &invalidated {
            warn!(edge = %edge_id, node = %id, "edge removed: node removal left it without members");
            self.drop_edge(edge_id)?;
        }

        if let Some(nodes) = self.nodes.get_mut(&id.type_id) {
            nodes.shift_remove(&id.object_id);
        }
        self.system_data.remove_all(Some(id));
        debug!(node = %id, cascaded = invalidated.len(), "node removed");
        self.notify(GraphEvent::NodeRemoved(id.clone()));
        Ok(())
    }

    /// Remove every incident edge explicitly, then the node
    pub fn remove_node_with_edges(&mut self, id: &Identifier) -> GraphResult<()> {
        self.ensure_live()?;
        let incident = self.get_node(id)?.all_edges(None);
        for edge_id in &incident {
            self.drop_edge(edge_id)?;
        }
        self.remove_node(id)
    }

    pub fn remove_all_nodes(&mut self) -> GraphResult<()> {
        self.ensure_live()?;
        for id in self.node_ids() {
            self.remove_node(&id)?;
        }
        Ok(())
    }

    pub fn remove_all_nodes_of(&mut self, type_id: &TypeId) -> GraphResult<()> {
        self.ensure_live()?;
        self.schemas.expect_kind(type_id, SchemaKind::Node)?;
        for id in self.node_ids_of(type_id) {
            self.remove_node(&id)?;
        }
        Ok(())
    }

    // ============================================================
    // Structure: edges
    // ============================================================

    /// Add a directed hyperedge.
    ///
    /// Every node is validated before anything is registered; on error the
    /// graph is unchanged.
    pub fn add_directed_edge<S, T>(&mut self, id: Identifier, sources: S, targets: T) -> GraphResult<Identifier>
    where
        S: IntoIterator<Item = Identifier>,
        T: IntoIterator<Item = Identifier>,
    {
        self.check_new_edge(&id, SchemaKind::DirectedEdge)?;
        let sources = self.collect_members(&id, sources)?;
        let targets = self.collect_members(&id, targets)?;
        if sources.is_empty() || targets.is_empty() {
            return Err(GraphError::EmptyMembership(id));
        }

        let internal_id = self.alloc_internal_id();
        for node in &sources {
            self.attach(node, Role::Source, &id);
        }
        for node in &targets {
            self.attach(node, Role::Target, &id);
        }
        self.insert_edge(Edge::directed(id.clone(), internal_id, sources, targets));
        Ok(id)
    }

    /// Add an undirected hyperedge
    pub fn add_undirected_edge<M>(&mut self, id: Identifier, members: M) -> GraphResult<Identifier>
    where
        M: IntoIterator<Item = Identifier>,
    {
        self.check_new_edge(&id, SchemaKind::UndirectedEdge)?;
        let members = self.collect_members(&id, members)?;
        if members.is_empty() {
            return Err(GraphError::EmptyMembership(id));
        }

        let internal_id = self.alloc_internal_id();
        for node in &members {
            self.attach(node, Role::Member, &id);
        }
        self.insert_edge(Edge::undirected(id.clone(), internal_id, members));
        Ok(id)
    }

    fn check_new_edge(&self, id: &Identifier, kind: SchemaKind) -> GraphResult<()> {
        self.ensure_live()?;
        self.ensure_owned(id)?;
        self.schemas.expect_kind(&id.type_id, kind)?;
        if self.has_edge(id) {
            return Err(GraphError::DuplicateId(id.clone()));
        }
        Ok(())
    }

    fn check_member(&self, node: &Identifier) -> GraphResult<()> {
        self.ensure_owned(node)?;
        if self.node_ref(node).is_none() {
            return Err(GraphError::UnknownId(node.clone()));
        }
        Ok(())
    }

    fn collect_members<I>(&self, edge: &Identifier, nodes: I) -> GraphResult<IndexSet<Identifier>>
    where
        I: IntoIterator<Item = Identifier>,
    {
        let mut set = IndexSet::new();
        for node in nodes {
            self.check_member(&node)?;
            if set.contains(&node) {
                return Err(GraphError::DuplicateMembership {
                    edge: edge.clone(),
                    node,
                });
            }
            set.insert(node);
        }
        Ok(set)
    }

    fn attach(&mut self, node: &Identifier, role: Role, edge: &Identifier) {
        if let Some(n) = self.node_mut(node) {
            n.attach(role, edge);
        }
    }

    fn insert_edge(&mut self, edge: Edge) {
        let id = edge.id().clone();
        let capacity = self.config.initial_edge_capacity;
        debug!(edge = %id, internal_id = edge.internal_id(), "edge added");
        self.edges
            .entry(id.type_id.clone())
            .or_insert_with(|| IndexMap::with_capacity(capacity))
            .insert(id.object_id.clone(), edge);
        self.notify(GraphEvent::EdgeAdded(id));
    }

    pub fn get_edge(&self, id: &Identifier) -> GraphResult<&Edge> {
        self.ensure_live()?;
        self.ensure_owned(id)?;
        self.edge_ref(id).ok_or_else(|| GraphError::UnknownId(id.clone()))
    }

    pub(crate) fn edge_ref(&self, id: &Identifier) -> Option<&Edge> {
        self.edges.get(&id.type_id)?.get(&id.object_id)
    }

    fn edge_mut(&mut self, id: &Identifier) -> Option<&mut Edge> {
        self.edges.get_mut(&id.type_id)?.get_mut(&id.object_id)
    }

    pub fn has_edge(&self, id: &Identifier) -> bool {
        id.store == self.id.store && self.edge_ref(id).is_some()
    }

    pub fn remove_edge(&mut self, id: &Identifier) -> GraphResult<()> {
        self.ensure_live()?;
        self.get_edge(id)?;
        self.drop_edge(id)
    }

    /// Strip features, detach member nodes, unregister, notify
    fn drop_edge(&mut self, id: &Identifier) -> GraphResult<()> {
        let edge = self
            .edges
            .get_mut(&id.type_id)
            .and_then(|m| m.shift_remove(&id.object_id))
            .ok_or_else(|| GraphError::UnknownId(id.clone()))?;

        self.schemas.storage_mut(&id.type_id)?.strip_item(edge.internal_id());
        for node_id in edge.nodes() {
            let roles = edge.roles_of(&node_id);
            if let Some(node) = self.node_mut(&node_id) {
                for role in roles {
                    node.detach(role, id);
                }
            }
        }
        self.system_data.remove_all(Some(id));
        debug!(edge = %id, "edge removed");
        self.notify(GraphEvent::EdgeRemoved(id.clone()));
        Ok(())
    }

    pub fn remove_all_edges(&mut self) -> GraphResult<()> {
        self.ensure_live()?;
        for id in self.edge_ids() {
            self.drop_edge(&id)?;
        }
        Ok(())
    }

    pub fn remove_all_edges_of(&mut self, type_id: &TypeId) -> GraphResult<()> {
        self.ensure_live()?;
        let actual = self.schemas.kind(type_id)?;
        if !actual.is_edge() {
            return Err(GraphError::NotAnEdgeSchema {
                type_id: type_id.clone(),
                actual,
            });
        }
        for id in self.edge_ids_of(type_id) {
            self.drop_edge(&id)?;
        }
        Ok(())
    }

    // ============================================================
    // Edge membership
    // ============================================================

    pub fn add_source(&mut self, edge: &Identifier, node: Identifier) -> GraphResult<()> {
        self.add_role(edge, node, Role::Source)
    }

    pub fn add_target(&mut self, edge: &Identifier, node: Identifier) -> GraphResult<()> {
        self.add_role(edge, node, Role::Target)
    }

    pub fn add_member(&mut self, edge: &Identifier, node: Identifier) -> GraphResult<()> {
        self.add_role(edge, node, Role::Member)
    }

    /// Returns `true` when the edge was deleted because it lost its last
    /// source or target
    pub fn remove_source(&mut self, edge: &Identifier, node: &Identifier) -> GraphResult<bool> {
        self.remove_role(edge, node, Role::Source)
    }

    /// Returns `true` when the edge was deleted because it lost its last
    /// source or target
    pub fn remove_target(&mut self, edge: &Identifier, node: &Identifier) -> GraphResult<bool> {
        self.remove_role(edge, node, Role::Target)
    }

    /// Returns `true` when the edge was deleted because it lost its last
    /// member
    pub fn remove_member(&mut self, edge: &Identifier, node: &Identifier) -> GraphResult<bool> {
        self.remove_role(edge, node, Role::Member)
    }

    fn expect_role(&self, edge: &Identifier, role: Role) -> GraphResult<()> {
        let expected = match role {
            Role::Source | Role::Target => SchemaKind::DirectedEdge,
            Role::Member => SchemaKind::UndirectedEdge,
        };
        self.schemas.expect_kind(&edge.type_id, expected)
    }

    fn add_role(&mut self, edge: &Identifier, node: Identifier, role: Role) -> GraphResult<()> {
        self.ensure_live()?;
        self.get_edge(edge)?;
        self.expect_role(edge, role)?;
        self.check_member(&node)?;

        let set = self
            .edge_mut(edge)
            .and_then(|e| e.role_set_mut(role))
            .ok_or_else(|| GraphError::UnsupportedVariant(format!("{:?} on {}", role, edge)))?;
        if !set.insert(node.clone()) {
            return Err(GraphError::DuplicateMembership {
                edge: edge.clone(),
                node,
            });
        }
        self.attach(&node, role, edge);
        trace!(edge = %edge, node = %node, ?role, "membership added");
        Ok(())
    }

    fn remove_role(&mut self, edge: &Identifier, node: &Identifier, role: Role) -> GraphResult<bool> {
        self.ensure_live()?;
        self.get_edge(edge)?;
        self.expect_role(edge, role)?;
        self.ensure_owned(node)?;
        if !self.edge_ref(edge).is_some_and(|e| e.roles_of(node).contains(&role)) {
            return Err(GraphError::NotAMember {
                edge: edge.clone(),
                node: node.clone(),
            });
        }

        if let Some(n) = self.node_mut(node) {
            n.detach(role, edge);
        }
        let now_valid = match self.edge_mut(edge) {
            Some(e) => {
                if let Some(set) = e.role_set_mut(role) {
                    set.shift_remove(node);
                }
                e.is_valid()
            }
            None => return Err(GraphError::UnknownId(edge.clone())),
        };
        trace!(edge = %edge, node = %node, ?role, "membership removed");

        if now_valid {
            return Ok(false);
        }
        warn!(edge = %edge, node = %node, "edge removed: membership removal left it empty");
        self.drop_edge(edge)?;
        Ok(true)
    }

    // ============================================================
    // Lookup and iteration
    // ============================================================

    /// Node, edge or the graph itself
    pub fn has_graph_item(&self, id: &Identifier) -> bool {
        (!self.destroyed && id == &self.id) || self.has_node(id) || self.has_edge(id)
    }

    /// View of a node or edge for incidence queries
    pub fn item(&self, id: &Identifier) -> GraphResult<GraphItem<'_>> {
        self.ensure_live()?;
        self.ensure_owned(id)?;
        if let Some(node) = self.node_ref(id) {
            return Ok(GraphItem::Node(NodeView::new(self, node)));
        }
        if let Some(edge) = self.edge_ref(id) {
            return Ok(GraphItem::Edge(EdgeView::new(self, edge)));
        }
        Err(GraphError::UnknownId(id.clone()))
    }

    pub fn node_view(&self, id: &Identifier) -> GraphResult<NodeView<'_>> {
        Ok(NodeView::new(self, self.get_node(id)?))
    }

    pub fn edge_view(&self, id: &Identifier) -> GraphResult<EdgeView<'_>> {
        Ok(EdgeView::new(self, self.get_edge(id)?))
    }

    /// All nodes, grouped by schema in registration order
    pub fn nodes(&self) -> Vec<&Node> {
        self.schemas
            .ids_of(SchemaKind::Node)
            .iter()
            .filter_map(|t| self.nodes.get(t))
            .flat_map(|m| m.values())
            .collect()
    }

    pub fn nodes_of(&self, type_id: &TypeId) -> Vec<&Node> {
        self.nodes
            .get(type_id)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    pub fn node_ids(&self) -> Vec<Identifier> {
        self.nodes().into_iter().map(|n| n.id.clone()).collect()
    }

    pub fn node_ids_of(&self, type_id: &TypeId) -> Vec<Identifier> {
        self.nodes_of(type_id).into_iter().map(|n| n.id.clone()).collect()
    }

    /// All edges, grouped by schema in registration order
    pub fn edges(&self) -> Vec<&Edge> {
        self.schemas
            .ids()
            .iter()
            .filter_map(|t| self.edges.get(t))
            .flat_map(|m| m.values())
            .collect()
    }

    pub fn edges_of(&self, type_id: &TypeId) -> Vec<&Edge> {
        self.edges
            .get(type_id)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    pub fn edge_ids(&self) -> Vec<Identifier> {
        self.edges().into_iter().map(|e| e.id().clone()).collect()
    }

    pub fn edge_ids_of(&self, type_id: &TypeId) -> Vec<Identifier> {
        self.edges_of(type_id).into_iter().map(|e| e.id().clone()).collect()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.values().map(IndexMap::len).sum()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.values().map(IndexMap::len).sum()
    }

    /// Items of one type; the graph's own type counts the graph itself
    pub fn num_graph_items(&self, type_id: &TypeId) -> usize {
        if !self.destroyed && type_id == self.graph_type_id() {
            return 1;
        }
        self.nodes.get(type_id).map_or(0, IndexMap::len) + self.edges.get(type_id).map_or(0, IndexMap::len)
    }

    // ============================================================
    // Features
    // ============================================================

    fn internal_id_of(&self, id: &Identifier) -> GraphResult<u64> {
        self.ensure_live()?;
        self.ensure_owned(id)?;
        if id == &self.id {
            return Ok(self.internal_id);
        }
        if let Some(node) = self.node_ref(id) {
            return Ok(node.internal_id);
        }
        if let Some(edge) = self.edge_ref(id) {
            return Ok(edge.internal_id());
        }
        Err(GraphError::UnknownId(id.clone()))
    }

    fn not_declared(id: &Identifier, name: &str) -> GraphError {
        GraphError::FeatureNotDeclared {
            type_id: id.type_id.clone(),
            feature: name.to_string(),
        }
    }

    fn stored_feature(&self, id: &Identifier, name: &str) -> GraphResult<(u64, &StoredFeature)> {
        let internal_id = self.internal_id_of(id)?;
        let feature = self
            .schemas
            .storage(&id.type_id)?
            .feature(name)
            .ok_or_else(|| Self::not_declared(id, name))?;
        Ok((internal_id, feature))
    }

    /// Read a feature; unset explicit values read as `Unknown`
    pub fn get_feature_value(&self, id: &Identifier, name: &str) -> GraphResult<FeatureValue> {
        match self.stored_feature(id, name)? {
            (internal_id, StoredFeature::Explicit { column, .. }) => Ok(column.get(internal_id as usize)),
            (internal_id, StoredFeature::Derived(slot)) => slot.value(self, id, internal_id),
        }
    }

    /// Write an explicit feature, returning the previous value.
    ///
    /// Text and numeric input are coerced according to the feature's
    /// declared kind. A `FeatureSet` event follows every successful write.
    pub fn set_feature_value(
        &mut self,
        id: &Identifier,
        name: &str,
        input: impl Into<FeatureInput>,
    ) -> GraphResult<FeatureValue> {
        let internal_id = self.internal_id_of(id)?;
        let store = self.id.store.clone();
        let storage = self.schemas.storage_mut(&id.type_id)?;
        let (value, previous) = match storage.feature_mut(name) {
            None => return Err(Self::not_declared(id, name)),
            Some(StoredFeature::Derived(_)) => {
                return Err(GraphError::NotSettable {
                    feature: name.to_string(),
                })
            }
            Some(StoredFeature::Explicit { decl, column }) => {
                let value = decl.coerce(name, input.into(), &store)?;
                let previous = column.set(name, internal_id as usize, value.clone())?;
                (value, previous)
            }
        };
        trace!(item = %id, feature = name, value = %value, "feature set");
        self.notify(GraphEvent::FeatureSet {
            item: id.clone(),
            feature: name.to_string(),
            previous: previous.clone(),
            current: value,
        });
        Ok(previous)
    }

    /// `true` when the feature reads as anything but `Unknown`
    pub fn has_feature_value(&self, id: &Identifier, name: &str) -> GraphResult<bool> {
        match self.stored_feature(id, name)? {
            (internal_id, StoredFeature::Explicit { column, .. }) => Ok(column.is_set(internal_id as usize)),
            (internal_id, StoredFeature::Derived(slot)) => {
                Ok(!slot.value(self, id, internal_id)?.is_unknown())
            }
        }
    }

    /// Reset an explicit feature to `Unknown`, returning the previous value
    pub fn remove_feature_value(&mut self, id: &Identifier, name: &str) -> GraphResult<FeatureValue> {
        let internal_id = self.internal_id_of(id)?;
        let storage = self.schemas.storage_mut(&id.type_id)?;
        let previous = match storage.feature_mut(name) {
            None => return Err(Self::not_declared(id, name)),
            Some(StoredFeature::Derived(_)) => {
                return Err(GraphError::NotSettable {
                    feature: name.to_string(),
                })
            }
            Some(StoredFeature::Explicit { column, .. }) => {
                if !column.is_set(internal_id as usize) {
                    return Err(GraphError::ValueAlreadyUnknown {
                        item: id.clone(),
                        feature: name.to_string(),
                    });
                }
                column.clear(internal_id as usize)
            }
        };
        trace!(item = %id, feature = name, "feature removed");
        self.notify(GraphEvent::FeatureSet {
            item: id.clone(),
            feature: name.to_string(),
            previous: previous.clone(),
            current: FeatureValue::Unknown,
        });
        Ok(previous)
    }

    /// Every explicit feature of an item, in declaration order
    pub fn feature_values(&self, id: &Identifier) -> GraphResult<IndexMap<String, FeatureValue>> {
        let internal_id = self.internal_id_of(id)?;
        let values: IndexMap<String, FeatureValue> = self
            .schemas
            .storage(&id.type_id)?
            .features()
            .filter_map(|(name, f)| match f {
                StoredFeature::Explicit { column, .. } => {
                    Some((name.to_string(), column.get(internal_id as usize)))
                }
                StoredFeature::Derived(_) => None,
            })
            .collect();
        Ok(values)
    }

    /// Forget the memoized value of a derived feature for one item.
    ///
    /// Explicit features have nothing cached; resetting one is a no-op.
    pub fn reset_cache(&self, id: &Identifier, name: &str) -> GraphResult<()> {
        if let (internal_id, StoredFeature::Derived(slot)) = self.stored_feature(id, name)? {
            trace!(item = %id, feature = name, "derived cache reset");
            slot.reset(internal_id);
        }
        Ok(())
    }

    /// Forget the memoized values of a derived feature for every item
    pub fn reset_all_caches(&self, type_id: &TypeId, name: &str) -> GraphResult<()> {
        self.ensure_live()?;
        let feature = self
            .schemas
            .storage(type_id)?
            .feature(name)
            .ok_or_else(|| GraphError::FeatureNotDeclared {
                type_id: type_id.clone(),
                feature: name.to_string(),
            })?;
        if let StoredFeature::Derived(slot) = feature {
            trace!(type_id = %type_id, feature = name, "derived caches reset");
            slot.reset_all();
        }
        Ok(())
    }

    /// Whether a derived feature currently holds a memoized value for `id`
    pub fn is_cached(&self, id: &Identifier, name: &str) -> GraphResult<bool> {
        match self.stored_feature(id, name)? {
            (internal_id, StoredFeature::Derived(slot)) => Ok(slot.is_cached(internal_id)),
            (_, StoredFeature::Explicit { .. }) => Ok(false),
        }
    }

    // ============================================================
    // System data
    // ============================================================

    fn check_owner(&self, owner: Option<&Identifier>) -> GraphResult<()> {
        self.ensure_live()?;
        if let Some(id) = owner {
            self.ensure_owned(id)?;
            if !self.has_graph_item(id) {
                return Err(GraphError::UnknownId(id.clone()));
            }
        }
        Ok(())
    }

    /// Store bookkeeping for an item (or globally with `None`), returning
    /// the replaced value
    pub fn set_system_data(
        &mut self,
        owner: Option<&Identifier>,
        key: &str,
        value: impl Into<String>,
    ) -> GraphResult<Option<String>> {
        self.check_owner(owner)?;
        Ok(self.system_data.set(owner, key, value.into()))
    }

    pub fn get_system_data(&self, owner: Option<&Identifier>, key: &str) -> GraphResult<Option<&str>> {
        self.check_owner(owner)?;
        Ok(self.system_data.get(owner, key))
    }

    pub fn remove_system_data(&mut self, owner: Option<&Identifier>, key: &str) -> GraphResult<Option<String>> {
        self.check_owner(owner)?;
        Ok(self.system_data.remove(owner, key))
    }

    pub fn remove_all_system_data(&mut self, owner: Option<&Identifier>) -> GraphResult<usize> {
        self.check_owner(owner)?;
        Ok(self.system_data.remove_all(owner))
    }

    pub fn system_data_keys(&self, owner: Option<&Identifier>) -> GraphResult<Vec<String>> {
        self.check_owner(owner)?;
        Ok(self.system_data.keys(owner))
    }

    // ============================================================
    // Listeners
    // ============================================================

    pub fn add_listener(&mut self, listener: Arc<dyn GraphListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn remove_all_listeners(&mut self) {
        self.listeners.clear();
    }

    pub fn num_listeners(&self) -> usize {
        self.listeners.len()
    }

    /// Forward an event (typically `ModelCompleted` or `Custom`) to all
    /// listeners
    pub fn dispatch(&self, event: GraphEvent) -> GraphResult<()> {
        self.ensure_live()?;
        self.notify(event);
        Ok(())
    }

    // ============================================================
    // Bulk
    // ============================================================

    /// New empty graph with the same schemas and a new object id
    pub fn copy_schema(&self, object_id: impl Into<String>) -> GraphResult<Graph> {
        self.ensure_live()?;
        let mut copy = Graph::with_config(self.graph_type_id().clone(), object_id, self.config.clone())?;
        for (type_id, decl) in self.schemas.declarations() {
            if type_id == self.graph_type_id() {
                copy.schemas.replace(type_id, decl.clone())?;
            } else {
                copy.schemas.add(type_id.clone(), decl.clone())?;
            }
        }
        info!(from = %self.store_id(), to = %copy.store_id(), "schemas copied");
        Ok(copy)
    }

    /// Deep copy under a new object id.
    ///
    /// Schemas, topology and explicit feature values are reproduced; item
    /// object ids are preserved, internal ids are reassigned, and `MultiId`
    /// values pointing into this graph are rebound to the copy. Listeners
    /// and system data are not copied.
    pub fn copy(&self, object_id: impl Into<String>) -> GraphResult<Graph> {
        let mut copy = self.copy_schema(object_id)?;
        let to = copy.store_id().clone();

        for node in self.nodes() {
            copy.add_node(node.id.with_store(&to))?;
        }
        for edge in self.edges() {
            let id = edge.id().with_store(&to);
            match edge {
                Edge::Directed(e) => {
                    copy.add_directed_edge(
                        id,
                        e.sources.iter().map(|n| n.with_store(&to)),
                        e.targets.iter().map(|n| n.with_store(&to)),
                    )?;
                }
                Edge::Undirected(e) => {
                    copy.add_undirected_edge(id, e.members.iter().map(|n| n.with_store(&to)))?;
                }
            }
        }

        let items = std::iter::once(self.id.clone())
            .chain(self.node_ids())
            .chain(self.edge_ids());
        for old_id in items {
            let new_id = if old_id == self.id {
                copy.id.clone()
            } else {
                old_id.with_store(&to)
            };
            for (name, value) in self.feature_values(&old_id)? {
                if value.is_unknown() {
                    continue;
                }
                let value = value.remap_store(self.store_id(), &to);
                copy.set_feature_value(&new_id, &name, value)?;
            }
        }
        info!(from = %self.store_id(), to = %to, nodes = copy.num_nodes(), edges = copy.num_edges(), "graph copied");
        Ok(copy)
    }

    /// Release all state. Every later fallible call returns `Destroyed`.
    pub fn destroy(&mut self) -> GraphResult<()> {
        self.ensure_live()?;
        self.nodes.clear();
        self.edges.clear();
        self.schemas.clear();
        self.system_data.clear();
        self.listeners.clear();
        self.destroyed = true;
        info!(graph = %self.id, "graph destroyed");
        Ok(())
    }
}
