//! Insertion-ordered map used by the binding tables.
//!
//! Scope name tables and lexical-dependency sets iterate in declaration
//! order so diagnostics and free-variable promotion are deterministic.

use rustc_hash::FxHashMap;
use std::hash::Hash;

/// A hash map that preserves insertion order on iteration.
#[derive(Debug, Clone)]
pub struct OrderedMap<K, V> {
    entries: Vec<(K, V)>,
    index: FxHashMap<K, usize>,
}

impl<K: Eq + Hash + Clone, V> OrderedMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(&idx) = self.index.get(&key) {
            Some(std::mem::replace(&mut self.entries[idx].1, value))
        } else {
            self.index.insert(key.clone(), self.entries.len());
            self.entries.push((key, value));
            None
        }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&idx| &self.entries[idx].1)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.index
            .get(key)
            .copied()
            .map(move |idx| &mut self.entries[idx].1)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Remove an entry, preserving the order of the rest.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let idx = self.index.remove(key)?;
        let (_, value) = self.entries.remove(idx);
        for (_, slot) in self.index.iter_mut() {
            if *slot > idx {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Drain all entries in insertion order.
    pub fn drain(&mut self) -> impl Iterator<Item = (K, V)> + '_ {
        self.index.clear();
        self.entries.drain(..)
    }
}

impl<K: Eq + Hash + Clone, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut map = OrderedMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        map.insert("c", 3);
        let keys: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut map = OrderedMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        assert_eq!(map.insert("a", 10), Some(1));
        let keys: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(map.get(&"a"), Some(&10));
    }

    #[test]
    fn remove_keeps_order() {
        let mut map = OrderedMap::new();
        map.insert("a", 1);
        map.insert("b", 2);
        map.insert("c", 3);
        assert_eq!(map.remove(&"b"), Some(2));
        let keys: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, ["a", "c"]);
        assert_eq!(map.get(&"c"), Some(&3));
    }
}
