//! Columnar storage for explicit feature values.
//!
//! Each explicit feature owns one column. Slots are indexed by the item's
//! internal id, so a read or write is a single array access.

use crate::graph::feature::{FeatureValue, ValueKind};
use crate::graph::store::{GraphError, GraphResult};
use crate::graph::types::Identifier;
use indexmap::IndexSet;

type CategoricalSlot = (String, Option<Vec<f64>>);

/// A single feature column.
#[derive(Debug, Clone)]
pub enum Column {
    Num(Vec<Option<f64>>),
    String(Vec<Option<String>>),
    Categorical(Vec<Option<CategoricalSlot>>),
    MultiCategorical(Vec<Option<Vec<String>>>),
    MultiId(Vec<Option<IndexSet<Identifier>>>),
}

fn put<T: Clone>(v: &mut Vec<Option<T>>, idx: usize, value: Option<T>) -> Option<T> {
    if idx >= v.len() {
        if value.is_none() {
            return None;
        }
        v.resize(idx + 1, None);
    }
    std::mem::replace(&mut v[idx], value)
}

impl Column {
    pub fn for_kind(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Num => Column::Num(Vec::new()),
            ValueKind::String => Column::String(Vec::new()),
            ValueKind::Categorical => Column::Categorical(Vec::new()),
            ValueKind::MultiCategorical => Column::MultiCategorical(Vec::new()),
            ValueKind::MultiId => Column::MultiId(Vec::new()),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Column::Num(_) => ValueKind::Num,
            Column::String(_) => ValueKind::String,
            Column::Categorical(_) => ValueKind::Categorical,
            Column::MultiCategorical(_) => ValueKind::MultiCategorical,
            Column::MultiId(_) => ValueKind::MultiId,
        }
    }

    /// Store `value` at `idx` and return what was there.
    ///
    /// Writing `Unknown` clears the slot.
    pub fn set(&mut self, feature: &str, idx: usize, value: FeatureValue) -> GraphResult<FeatureValue> {
        let previous = match (&mut *self, value) {
            (col, FeatureValue::Unknown) => return Ok(col.clear(idx)),
            (Column::Num(v), FeatureValue::Num(val)) => put(v, idx, Some(val)).map(FeatureValue::Num),
            (Column::String(v), FeatureValue::String(val)) => {
                put(v, idx, Some(val)).map(FeatureValue::String)
            }
            (Column::Categorical(v), FeatureValue::Categorical { category, probs }) => {
                put(v, idx, Some((category, probs)))
                    .map(|(category, probs)| FeatureValue::Categorical { category, probs })
            }
            (Column::MultiCategorical(v), FeatureValue::MultiCategorical(val)) => {
                put(v, idx, Some(val)).map(FeatureValue::MultiCategorical)
            }
            (Column::MultiId(v), FeatureValue::MultiId(val)) => {
                put(v, idx, Some(val)).map(FeatureValue::MultiId)
            }
            (col, other) => {
                return Err(GraphError::TypeMismatch {
                    feature: feature.to_string(),
                    expected: col.kind(),
                    reason: format!("got {:?}", other.kind()),
                });
            }
        };
        Ok(previous.unwrap_or(FeatureValue::Unknown))
    }

    pub fn get(&self, idx: usize) -> FeatureValue {
        let value = match self {
            Column::Num(v) => v.get(idx).and_then(|&o| o).map(FeatureValue::Num),
            Column::String(v) => v.get(idx).and_then(|o| o.clone()).map(FeatureValue::String),
            Column::Categorical(v) => v
                .get(idx)
                .and_then(|o| o.clone())
                .map(|(category, probs)| FeatureValue::Categorical { category, probs }),
            Column::MultiCategorical(v) => v
                .get(idx)
                .and_then(|o| o.clone())
                .map(FeatureValue::MultiCategorical),
            Column::MultiId(v) => v.get(idx).and_then(|o| o.clone()).map(FeatureValue::MultiId),
        };
        value.unwrap_or(FeatureValue::Unknown)
    }

    pub fn is_set(&self, idx: usize) -> bool {
        match self {
            Column::Num(v) => matches!(v.get(idx), Some(Some(_))),
            Column::String(v) => matches!(v.get(idx), Some(Some(_))),
            Column::Categorical(v) => matches!(v.get(idx), Some(Some(_))),
            Column::MultiCategorical(v) => matches!(v.get(idx), Some(Some(_))),
            Column::MultiId(v) => matches!(v.get(idx), Some(Some(_))),
        }
    }

    /// Reset a slot to unknown, returning the previous value
    pub fn clear(&mut self, idx: usize) -> FeatureValue {
        let previous = self.get(idx);
        match self {
            Column::Num(v) => {
                put(v, idx, None);
            }
            Column::String(v) => {
                put(v, idx, None);
            }
            Column::Categorical(v) => {
                put(v, idx, None);
            }
            Column::MultiCategorical(v) => {
                put(v, idx, None);
            }
            Column::MultiId(v) => {
                put(v, idx, None);
            }
        }
        previous
    }

    /// Number of set slots
    pub fn len(&self) -> usize {
        match self {
            Column::Num(v) => v.iter().flatten().count(),
            Column::String(v) => v.iter().flatten().count(),
            Column::Categorical(v) => v.iter().flatten().count(),
            Column::MultiCategorical(v) => v.iter().flatten().count(),
            Column::MultiId(v) => v.iter().flatten().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
