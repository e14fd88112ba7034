//! Feature declarations and feature values
//!
//! A feature is either *explicit* (stored, settable) or *derived* (computed
//! from the owning item on demand, optionally memoized). Explicit values are
//! checked against their declaration before they reach storage.

use super::store::{Graph, GraphError, GraphResult};
use super::types::{Identifier, StoreId};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Value kinds an explicit feature can be declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Num,
    String,
    Categorical,
    MultiCategorical,
    MultiId,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Num => "Num",
            ValueKind::String => "String",
            ValueKind::Categorical => "Categorical",
            ValueKind::MultiCategorical => "MultiCategorical",
            ValueKind::MultiId => "MultiId",
        };
        write!(f, "{}", name)
    }
}

/// Allowed categories of a (multi-)categorical feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategorySet {
    /// Only the listed categories are accepted
    Closed(Vec<String>),
    /// Any category is accepted
    Open,
}

impl CategorySet {
    pub fn closed<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CategorySet::Closed(categories.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, category: &str) -> bool {
        match self {
            CategorySet::Closed(cats) => cats.iter().any(|c| c == category),
            CategorySet::Open => true,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, CategorySet::Closed(_))
    }
}

/// A feature value
///
/// `Unknown` marks an unset slot; it is what reads return for items that
/// never had the feature written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureValue {
    Unknown,
    Num(f64),
    String(String),
    Categorical {
        category: String,
        /// Optional distribution over the declared categories
        probs: Option<Vec<f64>>,
    },
    MultiCategorical(Vec<String>),
    MultiId(IndexSet<Identifier>),
}

impl FeatureValue {
    pub fn categorical(category: impl Into<String>) -> Self {
        FeatureValue::Categorical {
            category: category.into(),
            probs: None,
        }
    }

    pub fn categorical_with_probs(category: impl Into<String>, probs: Vec<f64>) -> Self {
        FeatureValue::Categorical {
            category: category.into(),
            probs: Some(probs),
        }
    }

    pub fn multi_categorical<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FeatureValue::MultiCategorical(categories.into_iter().map(Into::into).collect())
    }

    pub fn multi_id<I: IntoIterator<Item = Identifier>>(ids: I) -> Self {
        FeatureValue::MultiId(ids.into_iter().collect())
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, FeatureValue::Unknown)
    }

    /// Kind of the value, `None` for `Unknown`
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            FeatureValue::Unknown => None,
            FeatureValue::Num(_) => Some(ValueKind::Num),
            FeatureValue::String(_) => Some(ValueKind::String),
            FeatureValue::Categorical { .. } => Some(ValueKind::Categorical),
            FeatureValue::MultiCategorical(_) => Some(ValueKind::MultiCategorical),
            FeatureValue::MultiId(_) => Some(ValueKind::MultiId),
        }
    }

    pub fn as_num(&self) -> Option<f64> {
        match self {
            FeatureValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            FeatureValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatureValue::Categorical { category, .. } => Some(category),
            _ => None,
        }
    }

    pub fn as_categories(&self) -> Option<&[String]> {
        match self {
            FeatureValue::MultiCategorical(cats) => Some(cats),
            _ => None,
        }
    }

    pub fn as_ids(&self) -> Option<&IndexSet<Identifier>> {
        match self {
            FeatureValue::MultiId(ids) => Some(ids),
            _ => None,
        }
    }

    /// Rebind identifiers that belong to `from` so they point into `to`
    pub(crate) fn remap_store(self, from: &StoreId, to: &StoreId) -> Self {
        match self {
            FeatureValue::MultiId(ids) => FeatureValue::MultiId(
                ids.into_iter()
                    .map(|id| if &id.store == from { id.with_store(to) } else { id })
                    .collect(),
            ),
            other => other,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Unknown => write!(f, "?"),
            FeatureValue::Num(n) => write!(f, "{}", n),
            FeatureValue::String(s) => write!(f, "{}", s),
            FeatureValue::Categorical { category, .. } => write!(f, "{}", category),
            FeatureValue::MultiCategorical(cats) => write!(f, "{}", cats.join(",")),
            FeatureValue::MultiId(ids) => {
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}.{}", id.type_id, id.object_id)?;
                }
                Ok(())
            }
        }
    }
}

/// What a caller hands to `set_feature_value`
///
/// The same coercion applies to node, edge and graph features.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureInput {
    Value(FeatureValue),
    Text(String),
    Number(f64),
}

impl From<FeatureValue> for FeatureInput {
    fn from(v: FeatureValue) -> Self {
        FeatureInput::Value(v)
    }
}

impl From<&str> for FeatureInput {
    fn from(s: &str) -> Self {
        FeatureInput::Text(s.to_string())
    }
}

impl From<String> for FeatureInput {
    fn from(s: String) -> Self {
        FeatureInput::Text(s)
    }
}

impl From<f64> for FeatureInput {
    fn from(n: f64) -> Self {
        FeatureInput::Number(n)
    }
}

impl From<i64> for FeatureInput {
    fn from(n: i64) -> Self {
        FeatureInput::Number(n as f64)
    }
}

impl From<i32> for FeatureInput {
    fn from(n: i32) -> Self {
        FeatureInput::Number(n as f64)
    }
}

/// Declaration of a stored feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitFeature {
    pub kind: ValueKind,
    /// Only consulted for categorical kinds
    pub categories: CategorySet,
}

impl ExplicitFeature {
    pub fn new(kind: ValueKind, categories: CategorySet) -> Self {
        ExplicitFeature { kind, categories }
    }

    /// Two declarations can share stored values iff kind and category
    /// configuration are identical
    pub fn is_storage_compatible(&self, other: &ExplicitFeature) -> bool {
        self.kind == other.kind && self.categories == other.categories
    }

    /// Turn caller input into a value of the declared kind and validate it
    pub fn coerce(
        &self,
        feature: &str,
        input: FeatureInput,
        store: &StoreId,
    ) -> GraphResult<FeatureValue> {
        let value = match input {
            FeatureInput::Value(FeatureValue::Unknown) => {
                return Err(mismatch(feature, self.kind, "use remove_feature_value to clear a value"));
            }
            FeatureInput::Value(v) => v,
            FeatureInput::Number(n) => match self.kind {
                ValueKind::Num => FeatureValue::Num(n),
                ValueKind::String => FeatureValue::String(n.to_string()),
                other => {
                    return Err(mismatch(feature, other, "numeric literal not accepted"));
                }
            },
            FeatureInput::Text(s) => self.parse_text(feature, &s, store)?,
        };
        self.validate(feature, &value)?;
        Ok(value)
    }

    fn parse_text(&self, feature: &str, text: &str, store: &StoreId) -> GraphResult<FeatureValue> {
        match self.kind {
            ValueKind::Num => text
                .trim()
                .parse::<f64>()
                .map(FeatureValue::Num)
                .map_err(|_| mismatch(feature, ValueKind::Num, &format!("'{}' is not a number", text))),
            ValueKind::String => Ok(FeatureValue::String(text.to_string())),
            ValueKind::Categorical => Ok(FeatureValue::categorical(text.trim())),
            ValueKind::MultiCategorical => Ok(FeatureValue::MultiCategorical(
                split_list(text).map(str::to_string).collect(),
            )),
            ValueKind::MultiId => {
                let mut ids = IndexSet::new();
                for part in split_list(text) {
                    let id = Identifier::parse_in(store, part).ok_or_else(|| {
                        mismatch(feature, ValueKind::MultiId, &format!("'{}' is not type.object", part))
                    })?;
                    ids.insert(id);
                }
                Ok(FeatureValue::MultiId(ids))
            }
        }
    }

    /// Check a value against this declaration
    pub fn validate(&self, feature: &str, value: &FeatureValue) -> GraphResult<()> {
        let actual = match value.kind() {
            None => return Ok(()),
            Some(kind) => kind,
        };
        if actual != self.kind {
            return Err(mismatch(feature, self.kind, &format!("got {}", actual)));
        }
        match value {
            FeatureValue::Num(n) if n.is_nan() => {
                Err(mismatch(feature, self.kind, "NaN is not a valid number"))
            }
            FeatureValue::Categorical { category, probs } => {
                if !self.categories.contains(category) {
                    return Err(mismatch(
                        feature,
                        self.kind,
                        &format!("category '{}' is not declared", category),
                    ));
                }
                if let Some(probs) = probs {
                    if let CategorySet::Closed(cats) = &self.categories {
                        if probs.len() != cats.len() {
                            return Err(mismatch(
                                feature,
                                self.kind,
                                &format!("expected {} probabilities, got {}", cats.len(), probs.len()),
                            ));
                        }
                    }
                    if probs.iter().any(|p| !(0.0..=1.0).contains(p)) {
                        return Err(mismatch(feature, self.kind, "probabilities must lie in [0, 1]"));
                    }
                }
                Ok(())
            }
            FeatureValue::MultiCategorical(cats) => {
                match cats.iter().find(|c| !self.categories.contains(c)) {
                    Some(bad) => Err(mismatch(
                        feature,
                        self.kind,
                        &format!("category '{}' is not declared", bad),
                    )),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }
}

fn split_list(text: &str) -> impl Iterator<Item = &str> {
    text.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn mismatch(feature: &str, expected: ValueKind, reason: &str) -> GraphError {
    GraphError::TypeMismatch {
        feature: feature.to_string(),
        expected,
        reason: reason.to_string(),
    }
}

/// Evaluator signature of a derived feature
pub type Evaluator = dyn Fn(&Graph, &Identifier) -> GraphResult<FeatureValue> + Send + Sync;

/// A computed feature
///
/// The evaluator receives the graph that is evaluating it, so the same
/// declaration works unchanged in a copied graph.
#[derive(Clone)]
pub struct DerivedFeature {
    evaluator: Arc<Evaluator>,
    cacheable: bool,
}

impl DerivedFeature {
    pub fn new<F>(cacheable: bool, evaluator: F) -> Self
    where
        F: Fn(&Graph, &Identifier) -> GraphResult<FeatureValue> + Send + Sync + 'static,
    {
        DerivedFeature {
            evaluator: Arc::new(evaluator),
            cacheable,
        }
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn evaluate(&self, graph: &Graph, item: &Identifier) -> GraphResult<FeatureValue> {
        (self.evaluator)(graph, item)
    }
}

impl PartialEq for DerivedFeature {
    fn eq(&self, other: &Self) -> bool {
        self.cacheable == other.cacheable && Arc::ptr_eq(&self.evaluator, &other.evaluator)
    }
}

impl fmt::Debug for DerivedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedFeature")
            .field("cacheable", &self.cacheable)
            .finish_non_exhaustive()
    }
}

/// Declaration of a single feature in a schema
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureDecl {
    Explicit(ExplicitFeature),
    Derived(DerivedFeature),
}

impl FeatureDecl {
    pub fn num() -> Self {
        FeatureDecl::Explicit(ExplicitFeature::new(ValueKind::Num, CategorySet::Open))
    }

    pub fn string() -> Self {
        FeatureDecl::Explicit(ExplicitFeature::new(ValueKind::String, CategorySet::Open))
    }

    pub fn categorical<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FeatureDecl::Explicit(ExplicitFeature::new(
            ValueKind::Categorical,
            CategorySet::closed(categories),
        ))
    }

    pub fn open_categorical() -> Self {
        FeatureDecl::Explicit(ExplicitFeature::new(ValueKind::Categorical, CategorySet::Open))
    }

    pub fn multi_categorical<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FeatureDecl::Explicit(ExplicitFeature::new(
            ValueKind::MultiCategorical,
            CategorySet::closed(categories),
        ))
    }

    pub fn multi_id() -> Self {
        FeatureDecl::Explicit(ExplicitFeature::new(ValueKind::MultiId, CategorySet::Open))
    }

    pub fn derived<F>(cacheable: bool, evaluator: F) -> Self
    where
        F: Fn(&Graph, &Identifier) -> GraphResult<FeatureValue> + Send + Sync + 'static,
    {
        FeatureDecl::Derived(DerivedFeature::new(cacheable, evaluator))
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, FeatureDecl::Explicit(_))
    }

    pub fn as_explicit(&self) -> Option<&ExplicitFeature> {
        match self {
            FeatureDecl::Explicit(e) => Some(e),
            FeatureDecl::Derived(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StoreId {
        StoreId::new("G", "g1")
    }

    fn explicit(decl: FeatureDecl) -> ExplicitFeature {
        decl.as_explicit().cloned().unwrap()
    }

    #[test]
    fn test_value_kinds() {
        assert_eq!(FeatureValue::Num(1.0).kind(), Some(ValueKind::Num));
        assert_eq!(FeatureValue::String("x".into()).kind(), Some(ValueKind::String));
        assert_eq!(FeatureValue::categorical("a").kind(), Some(ValueKind::Categorical));
        assert_eq!(
            FeatureValue::multi_categorical(["a"]).kind(),
            Some(ValueKind::MultiCategorical)
        );
        assert_eq!(FeatureValue::multi_id([]).kind(), Some(ValueKind::MultiId));
        assert_eq!(FeatureValue::Unknown.kind(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FeatureValue::Unknown.to_string(), "?");
        assert_eq!(FeatureValue::Num(2.5).to_string(), "2.5");
        assert_eq!(FeatureValue::multi_categorical(["a", "b"]).to_string(), "a,b");

        let ids = FeatureValue::multi_id([
            Identifier::new(store(), "Person", "p1"),
            Identifier::new(store(), "Person", "p2"),
        ]);
        assert_eq!(ids.to_string(), "Person.p1,Person.p2");
    }

    #[test]
    fn test_multi_id_equality_ignores_order() {
        let a = Identifier::new(store(), "Person", "p1");
        let b = Identifier::new(store(), "Person", "p2");
        assert_eq!(
            FeatureValue::multi_id([a.clone(), b.clone()]),
            FeatureValue::multi_id([b, a])
        );
    }

    #[test]
    fn test_coerce_num() {
        let f = explicit(FeatureDecl::num());
        assert_eq!(f.coerce("age", " 42 ".into(), &store()).unwrap(), FeatureValue::Num(42.0));
        assert_eq!(f.coerce("age", 7i64.into(), &store()).unwrap(), FeatureValue::Num(7.0));
        assert!(matches!(
            f.coerce("age", "old".into(), &store()),
            Err(GraphError::TypeMismatch { .. })
        ));
        assert!(f.coerce("age", FeatureValue::String("1".into()).into(), &store()).is_err());
        assert!(f.coerce("age", FeatureValue::Unknown.into(), &store()).is_err());
    }

    #[test]
    fn test_coerce_string_accepts_numbers() {
        let f = explicit(FeatureDecl::string());
        assert_eq!(
            f.coerce("name", 3.5.into(), &store()).unwrap(),
            FeatureValue::String("3.5".into())
        );
    }

    #[test]
    fn test_closed_categorical() {
        let f = explicit(FeatureDecl::categorical(["red", "blue"]));
        assert_eq!(
            f.coerce("color", "red".into(), &store()).unwrap(),
            FeatureValue::categorical("red")
        );
        assert!(f.coerce("color", "green".into(), &store()).is_err());
        assert!(f.coerce("color", 1.0.into(), &store()).is_err());

        let with_probs = FeatureValue::categorical_with_probs("blue", vec![0.2, 0.8]);
        assert!(f.validate("color", &with_probs).is_ok());
        let bad_len = FeatureValue::categorical_with_probs("blue", vec![1.0]);
        assert!(f.validate("color", &bad_len).is_err());
    }

    #[test]
    fn test_open_categorical() {
        let f = explicit(FeatureDecl::open_categorical());
        assert!(f.coerce("tag", "anything".into(), &store()).is_ok());
    }

    #[test]
    fn test_multi_categorical_parsing() {
        let f = explicit(FeatureDecl::multi_categorical(["a", "b", "c"]));
        assert_eq!(
            f.coerce("tags", "a, c,,".into(), &store()).unwrap(),
            FeatureValue::multi_categorical(["a", "c"])
        );
        assert!(f.coerce("tags", "a,z".into(), &store()).is_err());
    }

    #[test]
    fn test_multi_id_parsing() {
        let f = explicit(FeatureDecl::multi_id());
        let value = f.coerce("refs", "Person.p1, Person.p2".into(), &store()).unwrap();
        let ids = value.as_ids().unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&Identifier::new(store(), "Person", "p2")));
        assert!(f.coerce("refs", "nodot".into(), &store()).is_err());
    }

    #[test]
    fn test_storage_compatibility() {
        let a = explicit(FeatureDecl::categorical(["x", "y"]));
        let b = explicit(FeatureDecl::categorical(["x", "y"]));
        let c = explicit(FeatureDecl::categorical(["x", "y", "z"]));
        let d = explicit(FeatureDecl::open_categorical());
        assert!(a.is_storage_compatible(&b));
        assert!(!a.is_storage_compatible(&c));
        assert!(!a.is_storage_compatible(&d));
        assert!(!explicit(FeatureDecl::num()).is_storage_compatible(&explicit(FeatureDecl::string())));
    }

    #[test]
    fn test_derived_equality_by_pointer() {
        let d = DerivedFeature::new(true, |_, _| Ok(FeatureValue::Num(1.0)));
        let same = d.clone();
        let other = DerivedFeature::new(true, |_, _| Ok(FeatureValue::Num(1.0)));
        assert_eq!(d, same);
        assert_ne!(d, other);
    }

    #[test]
    fn test_remap_store() {
        let from = store();
        let to = StoreId::new("G", "g2");
        let foreign = StoreId::new("G", "other");
        let value = FeatureValue::multi_id([
            Identifier::new(from.clone(), "Person", "p1"),
            Identifier::new(foreign.clone(), "Person", "p2"),
        ]);
        let remapped = value.remap_store(&from, &to);
        let ids = remapped.as_ids().unwrap();
        assert!(ids.contains(&Identifier::new(to, "Person", "p1")));
        assert!(ids.contains(&Identifier::new(foreign, "Person", "p2")));
    }
}
