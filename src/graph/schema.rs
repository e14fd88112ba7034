//! Schemas: declared form and storage-backed form
//!
//! Clients describe a type with a [`DeclaredSchema`]. The registry keeps, next
//! to it, a [`StorageSchema`] in which every explicit feature owns a column
//! and every derived feature owns a memo slot.

use super::feature::{ExplicitFeature, FeatureDecl};
use super::storage::{Column, DerivedSlot};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a schema describes; fixed at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaKind {
    Node,
    DirectedEdge,
    UndirectedEdge,
    Graph,
}

impl SchemaKind {
    pub fn is_edge(&self) -> bool {
        matches!(self, SchemaKind::DirectedEdge | SchemaKind::UndirectedEdge)
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchemaKind::Node => "Node",
            SchemaKind::DirectedEdge => "DirectedEdge",
            SchemaKind::UndirectedEdge => "UndirectedEdge",
            SchemaKind::Graph => "Graph",
        };
        write!(f, "{}", name)
    }
}

/// Schema as declared by a client
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredSchema {
    kind: SchemaKind,
    features: IndexMap<String, FeatureDecl>,
}

impl DeclaredSchema {
    pub fn new(kind: SchemaKind) -> Self {
        DeclaredSchema {
            kind,
            features: IndexMap::new(),
        }
    }

    pub fn node() -> Self {
        Self::new(SchemaKind::Node)
    }

    pub fn directed() -> Self {
        Self::new(SchemaKind::DirectedEdge)
    }

    pub fn undirected() -> Self {
        Self::new(SchemaKind::UndirectedEdge)
    }

    /// Builder form of [`DeclaredSchema::add_feature`]
    pub fn with_feature(mut self, name: impl Into<String>, decl: FeatureDecl) -> Self {
        self.add_feature(name, decl);
        self
    }

    /// Add or overwrite a feature declaration
    pub fn add_feature(&mut self, name: impl Into<String>, decl: FeatureDecl) -> Option<FeatureDecl> {
        self.features.insert(name.into(), decl)
    }

    pub fn remove_feature(&mut self, name: &str) -> Option<FeatureDecl> {
        self.features.shift_remove(name)
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureDecl> {
        self.features.get(name)
    }

    pub fn has_feature(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    pub fn features(&self) -> impl Iterator<Item = (&str, &FeatureDecl)> {
        self.features.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.features.keys().map(String::as_str).collect()
    }

    pub fn num_features(&self) -> usize {
        self.features.len()
    }
}

/// Storage-backed implementation of one declared feature
#[derive(Debug)]
pub enum StoredFeature {
    Explicit { decl: ExplicitFeature, column: Column },
    Derived(DerivedSlot),
}

impl StoredFeature {
    fn from_decl(decl: &FeatureDecl) -> Self {
        match decl {
            FeatureDecl::Explicit(e) => StoredFeature::Explicit {
                decl: e.clone(),
                column: Column::for_kind(e.kind),
            },
            FeatureDecl::Derived(d) => StoredFeature::Derived(DerivedSlot::new(d.clone())),
        }
    }
}

/// Storage view of a schema; owns the feature values of every item of
/// the type
#[derive(Debug)]
pub struct StorageSchema {
    kind: SchemaKind,
    features: IndexMap<String, StoredFeature>,
}

impl StorageSchema {
    pub fn from_declared(declared: &DeclaredSchema) -> Self {
        StorageSchema {
            kind: declared.kind,
            features: declared
                .features
                .iter()
                .map(|(name, decl)| (name.clone(), StoredFeature::from_decl(decl)))
                .collect(),
        }
    }

    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    pub fn feature(&self, name: &str) -> Option<&StoredFeature> {
        self.features.get(name)
    }

    pub fn feature_mut(&mut self, name: &str) -> Option<&mut StoredFeature> {
        self.features.get_mut(name)
    }

    pub fn features(&self) -> impl Iterator<Item = (&str, &StoredFeature)> {
        self.features.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Drop every explicit value and cached derived value of one item
    pub fn strip_item(&mut self, internal_id: u64) {
        let idx = internal_id as usize;
        for feature in self.features.values_mut() {
            match feature {
                StoredFeature::Explicit { column, .. } => {
                    column.clear(idx);
                }
                StoredFeature::Derived(slot) => slot.reset(internal_id),
            }
        }
    }
}

/// Rebuild storage for a new declaration, carrying values over.
///
/// A column survives iff the new declaration of the same name is explicit
/// with the same value kind and category configuration. Derived features
/// always start with an empty cache.
pub fn migrate(mut old: StorageSchema, new: &DeclaredSchema) -> StorageSchema {
    let features = new
        .features
        .iter()
        .map(|(name, decl)| {
            let kept = match (decl, old.features.shift_remove(name)) {
                (
                    FeatureDecl::Explicit(new_decl),
                    Some(StoredFeature::Explicit { decl: old_decl, column }),
                ) if old_decl.is_storage_compatible(new_decl) => Some(StoredFeature::Explicit {
                    decl: new_decl.clone(),
                    column,
                }),
                _ => None,
            };
            let stored = kept.unwrap_or_else(|| StoredFeature::from_decl(decl));
            (name.clone(), stored)
        })
        .collect();
    StorageSchema {
        kind: old.kind,
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::feature::FeatureValue;

    fn column_value(schema: &StorageSchema, name: &str, idx: usize) -> Option<FeatureValue> {
        match schema.feature(name)? {
            StoredFeature::Explicit { column, .. } => Some(column.get(idx)),
            StoredFeature::Derived(_) => None,
        }
    }

    fn set(schema: &mut StorageSchema, name: &str, idx: usize, value: FeatureValue) {
        match schema.feature_mut(name).unwrap() {
            StoredFeature::Explicit { column, .. } => {
                column.set(name, idx, value).unwrap();
            }
            StoredFeature::Derived(_) => panic!("derived"),
        }
    }

    #[test]
    fn test_declared_schema_builder() {
        let schema = DeclaredSchema::node()
            .with_feature("name", FeatureDecl::string())
            .with_feature("age", FeatureDecl::num());
        assert_eq!(schema.kind(), SchemaKind::Node);
        assert_eq!(schema.feature_names(), vec!["name", "age"]);
        assert!(schema.has_feature("age"));
        assert!(!schema.has_feature("email"));
    }

    #[test]
    fn test_storage_mirrors_declaration() {
        let declared = DeclaredSchema::node()
            .with_feature("age", FeatureDecl::num())
            .with_feature("twice", FeatureDecl::derived(false, |_, _| Ok(FeatureValue::Unknown)));
        let storage = StorageSchema::from_declared(&declared);
        assert!(matches!(storage.feature("age"), Some(StoredFeature::Explicit { .. })));
        assert!(matches!(storage.feature("twice"), Some(StoredFeature::Derived(_))));
    }

    #[test]
    fn test_migrate_keeps_compatible_values() {
        let declared = DeclaredSchema::node()
            .with_feature("age", FeatureDecl::num())
            .with_feature("color", FeatureDecl::categorical(["r", "g"]));
        let mut storage = StorageSchema::from_declared(&declared);
        set(&mut storage, "age", 3, FeatureValue::Num(30.0));
        set(&mut storage, "color", 3, FeatureValue::categorical("g"));

        let updated = DeclaredSchema::node()
            .with_feature("age", FeatureDecl::num())
            .with_feature("color", FeatureDecl::categorical(["r", "g"]))
            .with_feature("name", FeatureDecl::string());
        let migrated = migrate(storage, &updated);

        assert_eq!(column_value(&migrated, "age", 3), Some(FeatureValue::Num(30.0)));
        assert_eq!(column_value(&migrated, "color", 3), Some(FeatureValue::categorical("g")));
        assert_eq!(column_value(&migrated, "name", 3), Some(FeatureValue::Unknown));
    }

    #[test]
    fn test_migrate_drops_incompatible_values() {
        let declared = DeclaredSchema::node()
            .with_feature("age", FeatureDecl::num())
            .with_feature("color", FeatureDecl::categorical(["r", "g"]))
            .with_feature("gone", FeatureDecl::string());
        let mut storage = StorageSchema::from_declared(&declared);
        set(&mut storage, "age", 1, FeatureValue::Num(5.0));
        set(&mut storage, "color", 1, FeatureValue::categorical("r"));
        set(&mut storage, "gone", 1, FeatureValue::String("x".into()));

        let updated = DeclaredSchema::node()
            .with_feature("age", FeatureDecl::string())
            .with_feature("color", FeatureDecl::categorical(["r", "g", "b"]));
        let migrated = migrate(storage, &updated);

        assert_eq!(column_value(&migrated, "age", 1), Some(FeatureValue::Unknown));
        assert_eq!(column_value(&migrated, "color", 1), Some(FeatureValue::Unknown));
        assert!(migrated.feature("gone").is_none());
        assert_eq!(migrated.kind(), SchemaKind::Node);
    }

    #[test]
    fn test_strip_item() {
        let declared = DeclaredSchema::node().with_feature("age", FeatureDecl::num());
        let mut storage = StorageSchema::from_declared(&declared);
        set(&mut storage, "age", 4, FeatureValue::Num(1.0));
        set(&mut storage, "age", 5, FeatureValue::Num(2.0));
        storage.strip_item(4);
        assert_eq!(column_value(&storage, "age", 4), Some(FeatureValue::Unknown));
        assert_eq!(column_value(&storage, "age", 5), Some(FeatureValue::Num(2.0)));
    }
}
