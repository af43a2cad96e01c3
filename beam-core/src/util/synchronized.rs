//! `SynchronizedMap`/`SynchronizedSet`/`SynchronizedList`: thin `Mutex`-backed
//! collection wrappers sharing the `with(f)`-style scoped access idiom used by
//! [`crate::sync::Sync`], all built on the same "acquire, call closure, release"
//! shape.

use std::{
    collections::{HashMap, HashSet},
    hash::Hash,
    sync::Mutex,
};

/// a `HashMap` behind a mutex, exposing scoped access plus the handful of whole-map
/// operations callers reach for most often (get/insert/remove by key, snapshotting).
#[derive(Debug, Default)]
pub struct SynchronizedMap<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K: Eq + Hash, V> SynchronizedMap<K, V> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut HashMap<K, V>) -> R,
    {
        f(&mut self.inner.lock().unwrap())
    }

    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.with(|map| map.insert(key, value))
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.with(|map| map.remove(key))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.with(|map| map.contains_key(key))
    }

    pub fn len(&self) -> usize {
        self.with(|map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.with(|map| map.clear());
    }
}

impl<K: Eq + Hash, V: Clone> SynchronizedMap<K, V> {
    pub fn get(&self, key: &K) -> Option<V> {
        self.with(|map| map.get(key).cloned())
    }
}

/// a `HashSet` behind a mutex, same shape as [`SynchronizedMap`].
#[derive(Debug, Default)]
pub struct SynchronizedSet<T> {
    inner: Mutex<HashSet<T>>,
}

impl<T: Eq + Hash> SynchronizedSet<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashSet::new()) }
    }

    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut HashSet<T>) -> R,
    {
        f(&mut self.inner.lock().unwrap())
    }

    pub fn insert(&self, value: T) -> bool {
        self.with(|set| set.insert(value))
    }

    pub fn remove(&self, value: &T) -> bool {
        self.with(|set| set.remove(value))
    }

    pub fn contains(&self, value: &T) -> bool {
        self.with(|set| set.contains(value))
    }

    pub fn len(&self) -> usize {
        self.with(|set| set.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// a `Vec` behind a mutex, same shape as [`SynchronizedMap`]. used for ordered
/// registries where insertion order must survive (e.g. `ServiceClient`'s
/// replay-in-order lists of registered services/subscriptions).
#[derive(Debug, Default)]
pub struct SynchronizedList<T> {
    inner: Mutex<Vec<T>>,
}

impl<T> SynchronizedList<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Vec::new()) }
    }

    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Vec<T>) -> R,
    {
        f(&mut self.inner.lock().unwrap())
    }

    pub fn push(&self, value: T) {
        self.with(|list| list.push(value));
    }

    pub fn len(&self) -> usize {
        self.with(|list| list.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> SynchronizedList<T> {
    /// returns a snapshot copy of the current contents, in order -- used wherever the
    /// caller needs to iterate without holding the lock (e.g. replaying subscriptions
    /// during reconnect while new ones might be registered concurrently).
    pub fn snapshot(&self) -> Vec<T> {
        self.with(|list| list.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn map_basic_ops() {
        let map = SynchronizedMap::new();
        map.insert("a", 1);
        assert_eq!(map.get(&"a"), Some(1));
        assert!(map.contains_key(&"a"));
        assert_eq!(map.remove(&"a"), Some(1));
        assert!(map.is_empty());
    }

    #[test]
    fn set_basic_ops() {
        let set = SynchronizedSet::new();
        assert!(set.insert(1));
        assert!(!set.insert(1));
        assert!(set.contains(&1));
        assert!(set.remove(&1));
        assert!(set.is_empty());
    }

    #[test]
    fn list_preserves_order() {
        let list = SynchronizedList::new();
        list.push(1);
        list.push(2);
        list.push(3);
        assert_eq!(list.snapshot(), vec![1, 2, 3]);
    }
}
