//! Store configuration

use serde::{Deserialize, Serialize};

/// Tunables for a [`Graph`](crate::graph::Graph)
///
/// The defaults work for most cases; capacities only avoid early
/// reallocation of the per-type item maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Regular expression every schema type id must match
    pub type_id_pattern: String,
    /// Initial capacity of each node type's map
    pub initial_node_capacity: usize,
    /// Initial capacity of each edge type's map
    pub initial_edge_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            type_id_pattern: r"^[A-Za-z0-9_\-]+$".to_string(),
            initial_node_capacity: 1024,
            initial_edge_capacity: 4096,
        }
    }
}

impl StoreConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
