//! generic tagged-dispatch table: maps a small discriminant to a registered handler.
//! this is the shared shape behind `beam-rpc`'s `SlotRegistry` (dispatch by
//! `MessageTag`) and is kept here, in `beam-core`, because nothing about it is
//! specific to the service protocol -- just an enum-tagged variant plus a table
//! keyed by that tag.

use std::{collections::HashMap, hash::Hash};

/// append-only-after-construction table from a tag to a value of type `V`. built via
/// [`TagTable::builder`]/[`TagTableBuilder::register`], then frozen into an immutable
/// `TagTable` so lookups never need to synchronize.
pub struct TagTable<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V> TagTable<K, V> {
    pub fn builder() -> TagTableBuilder<K, V> {
        TagTableBuilder { entries: HashMap::new() }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// builder for a [`TagTable`]; `register` panics on a duplicate tag, treating a
/// double-registered message type as a programming error caught at startup, not a
/// runtime condition to handle gracefully.
pub struct TagTableBuilder<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash + std::fmt::Debug, V> TagTableBuilder<K, V> {
    pub fn register(mut self, key: K, value: V) -> Self {
        if self.entries.contains_key(&key) {
            panic!("beam_core::TagTable: duplicate registration for tag {key:?}");
        }
        self.entries.insert(key, value);
        self
    }

    pub fn build(self) -> TagTable<K, V> {
        TagTable { entries: self.entries }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builds_and_looks_up() {
        let table = TagTable::builder().register("a", 1).register("b", 2).build();
        assert_eq!(table.get(&"a"), Some(&1));
        assert_eq!(table.get(&"z"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    #[should_panic(expected = "duplicate registration")]
    fn panics_on_duplicate_registration() {
        let _ = TagTable::builder().register("a", 1).register("a", 2);
    }
}
