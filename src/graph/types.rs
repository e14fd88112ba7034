//! Core identifier types for the hypergraph store

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a schema (node, edge or graph type), e.g. "Person" or "Friend"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct TypeId(String);

impl TypeId {
    pub fn new(type_id: impl Into<String>) -> Self {
        TypeId(type_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TypeId {
    fn from(s: String) -> Self {
        TypeId(s)
    }
}

impl From<&str> for TypeId {
    fn from(s: &str) -> Self {
        TypeId(s.to_string())
    }
}

impl From<&TypeId> for TypeId {
    fn from(t: &TypeId) -> Self {
        t.clone()
    }
}

/// Identity of a graph: its own schema type id plus its object id.
///
/// Every item identifier carries the store id of the graph that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct StoreId {
    pub type_id: TypeId,
    pub object_id: String,
}

impl StoreId {
    pub fn new(type_id: impl Into<TypeId>, object_id: impl Into<String>) -> Self {
        StoreId {
            type_id: type_id.into(),
            object_id: object_id.into(),
        }
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.type_id, self.object_id)
    }
}

/// Composite identifier of any entity held by a graph
///
/// Two identifiers are equal iff store, type id and object id all match.
/// [`Identifier::is_equivalent`] ignores the store, which is how items are
/// matched across a graph and its copies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Identifier {
    pub store: StoreId,
    pub type_id: TypeId,
    pub object_id: String,
}

impl Identifier {
    pub fn new(store: StoreId, type_id: impl Into<TypeId>, object_id: impl Into<String>) -> Self {
        Identifier {
            store,
            type_id: type_id.into(),
            object_id: object_id.into(),
        }
    }

    /// Same type id and object id, regardless of store
    pub fn is_equivalent(&self, other: &Identifier) -> bool {
        self.type_id == other.type_id && self.object_id == other.object_id
    }

    /// The equivalent identifier inside another store
    pub fn with_store(&self, store: &StoreId) -> Identifier {
        Identifier {
            store: store.clone(),
            type_id: self.type_id.clone(),
            object_id: self.object_id.clone(),
        }
    }

    /// Parse the `type.object` short form, bound to `store`.
    ///
    /// The object id is everything after the first `.`.
    pub fn parse_in(store: &StoreId, text: &str) -> Option<Identifier> {
        let (type_id, object_id) = text.trim().split_once('.')?;
        if type_id.is_empty() || object_id.is_empty() {
            return None;
        }
        Some(Identifier::new(store.clone(), type_id, object_id))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}.{}", self.store, self.type_id, self.object_id)
    }
}
