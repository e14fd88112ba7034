//! Typed in-memory hypergraph
//!
//! This module implements the store's data model:
//! - Schemas declaring node, directed edge, undirected edge and graph types
//! - Nodes, and hyperedges over arbitrary non-empty node sets
//! - Explicit features stored column-wise, and derived features computed
//!   on demand with optional memoization
//! - Synchronous change notification to registered listeners

pub mod edge;
pub mod event;
pub mod feature;
pub mod item;
pub mod node;
pub mod registry;
pub mod schema;
pub mod storage;
pub mod store;
pub mod system_data;
pub mod types;

// Re-export main types
pub use edge::{DirectedEdge, Edge, UndirectedEdge};
pub use event::{GraphEvent, GraphListener, ListenerId};
pub use feature::{CategorySet, DerivedFeature, ExplicitFeature, FeatureDecl, FeatureInput, FeatureValue, ValueKind};
pub use item::{EdgeView, GraphItem, NodeView};
pub use node::{Node, Role};
pub use schema::{migrate, DeclaredSchema, SchemaKind, StorageSchema};
pub use store::{Graph, GraphError, GraphResult};
pub use types::{Identifier, StoreId, TypeId};
