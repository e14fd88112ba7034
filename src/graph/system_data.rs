//! Auxiliary key-value bookkeeping, independent of schemas and features

use super::types::Identifier;
use rustc_hash::FxHashMap;

#[derive(Debug, Default, Clone)]
pub struct SystemData {
    entries: FxHashMap<Option<Identifier>, FxHashMap<String, String>>,
}

impl SystemData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, returning the one it replaced
    pub fn set(&mut self, owner: Option<&Identifier>, key: &str, value: String) -> Option<String> {
        self.entries
            .entry(owner.cloned())
            .or_default()
            .insert(key.to_string(), value)
    }

    pub fn get(&self, owner: Option<&Identifier>, key: &str) -> Option<&str> {
        self.entries
            .get(&owner.cloned())
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }

    pub fn remove(&mut self, owner: Option<&Identifier>, key: &str) -> Option<String> {
        let owner = owner.cloned();
        let map = self.entries.get_mut(&owner)?;
        let removed = map.remove(key);
        if map.is_empty() {
            self.entries.remove(&owner);
        }
        removed
    }

    /// Drop every entry of one owner
    pub fn remove_all(&mut self, owner: Option<&Identifier>) -> usize {
        self.entries
            .remove(&owner.cloned())
            .map(|m| m.len())
            .unwrap_or(0)
    }

    pub fn keys(&self, owner: Option<&Identifier>) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .get(&owner.cloned())
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
