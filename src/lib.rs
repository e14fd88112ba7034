//! Hyperstore
//!
//! An embedded, typed, in-memory hypergraph store. Nodes and hyperedges are
//! instances of declared schemas; each item carries typed features that
//! are either stored explicitly or derived on demand.
//!
//! # Data model
//!
//! - Every graph has an identity ([`StoreId`]) and every item an
//!   [`Identifier`] scoped to that store
//! - Directed hyperedges connect a non-empty source set to a non-empty
//!   target set; undirected hyperedges connect a non-empty member set
//! - Removing a node cascades to any edge it leaves empty
//! - Feature values are `Num`, `String`, `Categorical`, `MultiCategorical`
//!   or `MultiId`, and read as `Unknown` until set
//!
//! ## Example Usage
//!
//! ```rust
//! use hyperstore::graph::{DeclaredSchema, FeatureDecl, FeatureValue, Graph};
//!
//! let mut graph = Graph::new("Social", "g1").unwrap();
//! graph
//!     .add_schema("Person", DeclaredSchema::node().with_feature("age", FeatureDecl::num()))
//!     .unwrap();
//! graph.add_schema("Friend", DeclaredSchema::undirected()).unwrap();
//!
//! let alice = graph.add_node(graph.id_for("Person", "alice")).unwrap();
//! let bob = graph.add_node(graph.id_for("Person", "bob")).unwrap();
//! graph
//!     .add_undirected_edge(graph.id_for("Friend", "f1"), [alice.clone(), bob.clone()])
//!     .unwrap();
//!
//! // Text input is coerced to the declared kind
//! graph.set_feature_value(&alice, "age", "30").unwrap();
//! assert_eq!(graph.get_feature_value(&alice, "age").unwrap(), FeatureValue::Num(30.0));
//!
//! // Removing bob leaves f1 with alice alone, so the edge survives
//! graph.remove_node(&bob).unwrap();
//! assert_eq!(graph.num_edges(), 1);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod graph;

// Re-export main types for convenience
pub use config::StoreConfig;
pub use graph::{
    DeclaredSchema, Edge, FeatureDecl, FeatureValue, Graph, GraphError, GraphEvent, GraphListener,
    GraphResult, Identifier, Node, SchemaKind, StoreId, TypeId,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
