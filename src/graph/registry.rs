//! Schema registry
//!
//! Holds both views of every registered schema, keyed by type id.

use super::schema::{migrate, DeclaredSchema, SchemaKind, StorageSchema};
use super::store::{GraphError, GraphResult};
use super::types::TypeId;
use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

#[derive(Debug)]
struct Entry {
    declared: DeclaredSchema,
    storage: StorageSchema,
}

#[derive(Debug)]
pub struct SchemaRegistry {
    type_id_pattern: Regex,
    schemas: IndexMap<TypeId, Entry>,
}

impl SchemaRegistry {
    pub fn new(type_id_pattern: Regex) -> Self {
        SchemaRegistry {
            type_id_pattern,
            schemas: IndexMap::new(),
        }
    }

    pub fn validate_type_id(&self, type_id: &TypeId) -> GraphResult<()> {
        if self.type_id_pattern.is_match(type_id.as_str()) {
            Ok(())
        } else {
            Err(GraphError::InvalidTypeId(type_id.to_string()))
        }
    }

    pub fn add(&mut self, type_id: TypeId, declared: DeclaredSchema) -> GraphResult<()> {
        self.validate_type_id(&type_id)?;
        if self.schemas.contains_key(&type_id) {
            return Err(GraphError::DuplicateSchema(type_id));
        }
        debug!(type_id = %type_id, kind = %declared.kind(), "schema added");
        let storage = StorageSchema::from_declared(&declared);
        self.schemas.insert(type_id, Entry { declared, storage });
        Ok(())
    }

    /// Swap in a new declaration, migrating stored values
    pub fn replace(&mut self, type_id: &TypeId, declared: DeclaredSchema) -> GraphResult<()> {
        let entry = self
            .schemas
            .get_mut(type_id)
            .ok_or_else(|| GraphError::UnknownSchema(type_id.clone()))?;
        if entry.declared.kind() != declared.kind() {
            return Err(GraphError::WrongSchemaKind {
                type_id: type_id.clone(),
                expected: entry.declared.kind(),
                actual: declared.kind(),
            });
        }
        let placeholder = StorageSchema::from_declared(&DeclaredSchema::new(declared.kind()));
        let old = std::mem::replace(&mut entry.storage, placeholder);
        entry.storage = migrate(old, &declared);
        entry.declared = declared;
        debug!(type_id = %type_id, "schema replaced");
        Ok(())
    }

    pub fn remove(&mut self, type_id: &TypeId) -> Option<DeclaredSchema> {
        self.schemas.shift_remove(type_id).map(|e| e.declared)
    }

    pub fn contains(&self, type_id: &TypeId) -> bool {
        self.schemas.contains_key(type_id)
    }

    pub fn declared(&self, type_id: &TypeId) -> GraphResult<&DeclaredSchema> {
        self.schemas
            .get(type_id)
            .map(|e| &e.declared)
            .ok_or_else(|| GraphError::UnknownSchema(type_id.clone()))
    }

    pub fn storage(&self, type_id: &TypeId) -> GraphResult<&StorageSchema> {
        self.schemas
            .get(type_id)
            .map(|e| &e.storage)
            .ok_or_else(|| GraphError::UnknownSchema(type_id.clone()))
    }

    pub fn storage_mut(&mut self, type_id: &TypeId) -> GraphResult<&mut StorageSchema> {
        self.schemas
            .get_mut(type_id)
            .map(|e| &mut e.storage)
            .ok_or_else(|| GraphError::UnknownSchema(type_id.clone()))
    }

    pub fn kind(&self, type_id: &TypeId) -> GraphResult<SchemaKind> {
        self.declared(type_id).map(DeclaredSchema::kind)
    }

    /// Fail unless `type_id` is registered with `expected` kind
    pub fn expect_kind(&self, type_id: &TypeId, expected: SchemaKind) -> GraphResult<()> {
        let actual = self.kind(type_id)?;
        if actual != expected {
            return Err(GraphError::WrongSchemaKind {
                type_id: type_id.clone(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    pub fn ids(&self) -> Vec<TypeId> {
        self.schemas.keys().cloned().collect()
    }

    pub fn ids_of(&self, kind: SchemaKind) -> Vec<TypeId> {
        self.schemas
            .iter()
            .filter(|(_, e)| e.declared.kind() == kind)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn declarations(&self) -> impl Iterator<Item = (&TypeId, &DeclaredSchema)> {
        self.schemas.iter().map(|(id, e)| (id, &e.declared))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn clear(&mut self) {
        self.schemas.clear();
    }
}
