//! Caller-owned dedup set for repeated errors.

use std::collections::{BTreeMap, HashSet};

use super::sink::ErrorCategory;

/// Keys of errors already seen in the current session, grouped by
/// category. The owner decides its lifetime and when to `reset`.
#[derive(Debug, Default, Clone)]
pub struct SeenErrorSet {
    by_category: BTreeMap<ErrorCategory, HashSet<String>>,
}

impl SeenErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `key` has not been marked in any category.
    pub fn is_new(&self, key: &str) -> bool {
        !self.by_category.values().any(|keys| keys.contains(key))
    }

    /// Record `key` under `category`. Returns true if it was not seen before.
    pub fn mark_seen(&mut self, category: ErrorCategory, key: &str) -> bool {
        if !self.is_new(key) {
            return false;
        }
        self.by_category
            .entry(category)
            .or_default()
            .insert(key.to_string())
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        self.by_category.clear();
    }

    /// Total distinct keys seen.
    pub fn len(&self) -> usize {
        self.by_category.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct keys seen for one category.
    pub fn count(&self, category: ErrorCategory) -> usize {
        self.by_category.get(&category).map_or(0, HashSet::len)
    }
}
