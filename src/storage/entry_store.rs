//! Keyed in-memory mirror of parsed files.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

/// In-memory mapping from primary key to an owned, parsed entry.
///
/// The store owns every value. Reads hand out shared references or clones,
/// never mutable aliases, so the only way to change an entry is through
/// [`insert`](Self::insert) and [`remove`](Self::remove).
#[derive(Debug, Clone)]
pub struct EntryStore<K, V> {
    entries: HashMap<K, V>,
}

impl<K, V> Default for EntryStore<K, V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> EntryStore<K, V> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry, returning the previous value.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.entries.insert(key, value)
    }

    /// Removes an entry, returning it if present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.remove(key)
    }

    /// Returns a read-only view of an entry.
    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    /// Returns `true` if the key is present.
    #[must_use]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Iterates over all entries in no particular order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    /// Iterates over all keys in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Drops every entry whose value fails `keep`, returning the removed keys.
    pub fn retain(&mut self, mut keep: impl FnMut(&K, &V) -> bool) -> Vec<K>
    where
        K: Clone,
    {
        let removed: Vec<K> = self
            .entries
            .iter()
            .filter(|(k, v)| !keep(k, v))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &removed {
            self.entries.remove(key);
        }
        removed
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> EntryStore<K, V> {
    /// Returns a copy of every value.
    #[must_use]
    pub fn cloned_values(&self) -> Vec<V> {
        self.entries.values().cloned().collect()
    }
}
