//! Memoization slot for derived features.

use crate::graph::feature::{DerivedFeature, FeatureValue};
use crate::graph::store::{Graph, GraphResult};
use crate::graph::types::Identifier;
use rustc_hash::FxHashMap;
use std::sync::RwLock;

/// A derived feature plus its per-item cache, keyed by internal id
#[derive(Debug)]
pub struct DerivedSlot {
    feature: DerivedFeature,
    cache: RwLock<FxHashMap<u64, FeatureValue>>,
}

impl DerivedSlot {
    pub fn new(feature: DerivedFeature) -> Self {
        DerivedSlot {
            feature,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn feature(&self) -> &DerivedFeature {
        &self.feature
    }

    /// Compute (or fetch the memoized) value for an item.
    ///
    /// No lock is held while the evaluator runs; it may read other derived
    /// features of the same schema.
    pub fn value(&self, graph: &Graph, item: &Identifier, internal_id: u64) -> GraphResult<FeatureValue> {
        if !self.feature.is_cacheable() {
            return self.feature.evaluate(graph, item);
        }
        if let Some(hit) = self.read_cache().get(&internal_id) {
            return Ok(hit.clone());
        }
        let value = self.feature.evaluate(graph, item)?;
        self.write_cache().insert(internal_id, value.clone());
        Ok(value)
    }

    pub fn is_cached(&self, internal_id: u64) -> bool {
        self.read_cache().contains_key(&internal_id)
    }

    pub fn reset(&self, internal_id: u64) {
        self.write_cache().remove(&internal_id);
    }

    pub fn reset_all(&self) {
        self.write_cache().clear();
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, FxHashMap<u64, FeatureValue>> {
        // A panicking evaluator never runs under the lock, so a poisoned
        // guard still holds a consistent map.
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, FxHashMap<u64, FeatureValue>> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }
}
