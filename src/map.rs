use core::borrow::Borrow;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::ops::Index;
use std::hash::DefaultHasher;

use alloc::vec::Vec;

use crate::iter::{IntoIter, Iter, IterMut, Values, ValuesMut};
use crate::view::{EntrySet, EntrySetMut, KeySet, KeySetMut, ValueCollection};
use crate::{Cursor, Redwood, RedwoodError};

/// An associative array, storing key-value pairs ordered by key.
///
/// Uses a Redwood red-black tree; lookups, insertions and removals are
/// O(log n). Iteration always runs in ascending key order.
pub struct RedwoodMap<K, V> {
    pub(crate) tree: Redwood<K, V>,
}

impl<K, V> RedwoodMap<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: Redwood::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tree: Redwood::with_capacity(capacity),
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        self.tree.reserve(additional);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Linear scan over every value.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.values().contains(value)
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree.first().map(|idx| self.tree.entry(idx))
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree.last().map(|idx| self.tree.entry(idx))
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.tree)
    }

    /// Allocates in proportion to the arena capacity, see [`IterMut`].
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.tree)
    }

    /// Live view of the keys.
    pub fn keys(&self) -> KeySet<'_, K, V> {
        KeySet::new(self)
    }

    /// Live view of the keys that can also remove entries.
    pub fn keys_mut(&mut self) -> KeySetMut<'_, K, V> {
        KeySetMut::new(self)
    }

    /// Live view of the values, in ascending order of their keys.
    pub fn values(&self) -> ValueCollection<'_, K, V> {
        ValueCollection::new(self)
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Live view of the entries.
    pub fn entries(&self) -> EntrySet<'_, K, V> {
        EntrySet::new(self)
    }

    /// Live view of the entries that can also remove them.
    pub fn entries_mut(&mut self) -> EntrySetMut<'_, K, V> {
        EntrySetMut::new(self)
    }

    /// Detached cursor over the entries; see [`Cursor`].
    pub fn cursor(&self) -> Cursor {
        Cursor::new(&self.tree)
    }

    pub(crate) fn value_iter(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }
}

impl<K: Ord, V> RedwoodMap<K, V> {
    /// Builds a map from entries already sorted by strictly ascending key,
    /// skipping per-entry insertion.
    ///
    /// # Errors
    ///
    /// Returns [`RedwoodError::NotPresorted`] if two neighbouring keys are
    /// out of order or equal.
    pub fn from_sorted_iter<I>(entries: I) -> Result<Self, RedwoodError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Ok(Self {
            tree: Redwood::from_sorted_vec(entries.into_iter().collect())?,
        })
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.find_by_key(key).is_some()
    }

    /// Inserts a key-value pair, returning the value previously stored under
    /// an equal key. The stored key is kept in that case.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.tree.add_node(key, value)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.find_by_key(key).map(|idx| self.tree.value(idx))
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.find_by_key(key).map(|idx| self.tree.entry(idx))
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let idx = self.tree.find_by_key(key)?;

        Some(self.tree.value_mut(idx))
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let idx = self.tree.find_by_key(key)?;

        Some(self.tree.remove_node(idx))
    }

    pub fn pop_first(&mut self) -> Option<(K, V)> {
        let idx = self.tree.first()?;

        Some(self.tree.remove_node(idx))
    }

    pub fn pop_last(&mut self) -> Option<(K, V)> {
        let idx = self.tree.last()?;

        Some(self.tree.remove_node(idx))
    }

    /// Keeps only the entries for which `keep` returns `true`.
    ///
    /// The surviving entries are relinked into a fresh balanced tree. If
    /// `keep` panics, the entries it has not rejected yet stay in the map.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let previous = core::mem::take(&mut self.tree);
        let mut guard = RetainGuard {
            id: previous.id,
            mod_count: previous.modification_count(),
            kept: Vec::with_capacity(previous.len()),
            current: None,
            rest: IntoIter::new(previous),
            map: self,
        };

        while let Some(entry) = guard.rest.next() {
            let (key, value) = guard.current.insert(entry);
            if keep(&*key, value) {
                guard.kept.extend(guard.current.take());
            } else {
                guard.current = None;
            }
        }
    }

    /// See [`Redwood::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`RedwoodError::InvariantViolation`] if the tree is corrupt.
    pub fn validate(&self) -> Result<usize, RedwoodError> {
        self.tree.validate()
    }
}

impl<K, V> Default for RedwoodMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone> Clone for RedwoodMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for RedwoodMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for RedwoodMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

impl<K: Eq, V: Eq> Eq for RedwoodMap<K, V> {}

/// Entry digests are combined with a wrapping sum, so the hash does not
/// depend on the order entries are visited in. Each digest is seeded with
/// the state of `state`, so a keyed hasher keeps its keys in effect.
impl<K: Hash, V: Hash> Hash for RedwoodMap<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.len());
        let seed = state.finish();

        let digest = self.iter().fold(0u64, |digest, entry| {
            let mut hasher = DefaultHasher::new();
            hasher.write_u64(seed);
            entry.hash(&mut hasher);
            digest.wrapping_add(hasher.finish())
        });

        state.write_u64(digest);
    }
}

/// Relinks whatever `retain` has not discarded, also when the predicate
/// unwinds.
struct RetainGuard<'a, K: Ord, V> {
    map: &'a mut RedwoodMap<K, V>,
    id: u64,
    mod_count: u64,
    kept: Vec<(K, V)>,
    current: Option<(K, V)>,
    rest: IntoIter<K, V>,
}

impl<K: Ord, V> Drop for RetainGuard<'_, K, V> {
    fn drop(&mut self) {
        let mut entries = core::mem::take(&mut self.kept);
        entries.extend(self.current.take());
        entries.extend(&mut self.rest);

        let mut tree = Redwood::link_sorted(entries);
        tree.id = self.id;
        tree.mod_count = self.mod_count + 1;
        self.map.tree = tree;
    }
}

impl<K, Q, V> Index<&Q> for RedwoodMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for RedwoodMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for RedwoodMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);

        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for RedwoodMap<K, V> {
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V> IntoIterator for RedwoodMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.tree)
    }
}

impl<'a, K, V> IntoIterator for &'a RedwoodMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut RedwoodMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    use super::RedwoodMap;

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    pub fn map_entry_multi_insertion() {
        let mut map = RedwoodMap::<usize, usize>::new();

        map.insert(3, 17);
        map.insert(2, 12);
        map.insert(1, 7);

        assert!(map.contains_key(&2));
        assert!(map.contains_key(&1));
        assert!(map.contains_key(&3));

        assert_eq!(map.insert(3, 19), Some(17));
        assert_eq!(*map.get(&3).unwrap(), 19);
        assert_eq!(map.len(), 3);
    }

    #[test]
    pub fn map_update_entry() {
        let mut map = RedwoodMap::<usize, usize>::new();

        map.insert(3, 17);
        *map.get_mut(&3).unwrap() = 5;

        assert_eq!(*map.get(&3).unwrap(), 5);
    }

    #[test]
    pub fn map_missing_keys_are_not_errors() {
        let mut map = RedwoodMap::<usize, usize>::new();
        map.insert(1, 1);

        assert_eq!(map.get(&2), None);
        assert_eq!(map.remove(&2), None);
        assert_eq!(map.len(), 1);
    }

    #[test]
    pub fn map_borrowed_lookup() {
        let mut map = RedwoodMap::new();
        map.insert("alpha".to_string(), 1);

        assert_eq!(map.get("alpha"), Some(&1));
        assert_eq!(map["alpha"], 1);
        assert_eq!(map.remove_entry("alpha"), Some(("alpha".to_string(), 1)));
    }

    #[test]
    pub fn map_pop_ends() {
        let mut map: RedwoodMap<_, _> = (1..=4).map(|k| (k, k * k)).collect();

        assert_eq!(map.first_key_value(), Some((&1, &1)));
        assert_eq!(map.last_key_value(), Some((&4, &16)));
        assert_eq!(map.pop_first(), Some((1, 1)));
        assert_eq!(map.pop_last(), Some((4, 16)));
        assert_eq!(map.iter().collect::<Vec<_>>(), [(&2, &4), (&3, &9)]);
    }

    #[test]
    pub fn map_retain_rebuilds_valid_tree() {
        let mut map: RedwoodMap<_, _> = (0..100).map(|k| (k, k)).collect();
        let cursor = map.cursor();

        map.retain(|key, value| {
            *value += 1;
            key % 3 == 0
        });

        assert_eq!(map.len(), 34);
        assert!(map.validate().is_ok());
        assert_eq!(map.get(&99), Some(&100));
        assert_eq!(map.get(&98), None);
        assert!(cursor.clone().next_entry(&map).is_err());
    }

    #[test]
    pub fn map_retain_keeps_unvisited_entries_when_predicate_panics() {
        let mut map: RedwoodMap<_, _> = (0..10).map(|k| (k, k)).collect();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            map.retain(|key, _| {
                assert_ne!(*key, 5, "predicate gave up");
                key % 2 == 0
            });
        }));

        assert!(outcome.is_err());
        assert_eq!(
            map.keys().iter().copied().collect::<Vec<_>>(),
            [0, 2, 4, 5, 6, 7, 8, 9]
        );
        assert!(map.validate().is_ok());
    }

    /// Records every byte it is fed; `finish` reports a fixed key.
    struct RecordingHasher {
        key: u64,
        written: Vec<u8>,
    }

    impl Hasher for RecordingHasher {
        fn finish(&self) -> u64 {
            self.key
        }

        fn write(&mut self, bytes: &[u8]) {
            self.written.extend_from_slice(bytes);
        }
    }

    #[test]
    pub fn map_hash_depends_on_caller_hasher_state() {
        let map: RedwoodMap<_, _> = (0..8).map(|k| (k, k)).collect();
        let record = |key| {
            let mut hasher = RecordingHasher {
                key,
                written: Vec::new(),
            };
            map.hash(&mut hasher);
            hasher.written
        };

        assert_eq!(record(1), record(1));
        assert_ne!(record(1), record(2));
    }

    #[test]
    pub fn map_equality_ignores_insertion_order() {
        let forward: RedwoodMap<_, _> = (0..20).map(|k| (k, -k)).collect();
        let backward: RedwoodMap<_, _> = (0..20).rev().map(|k| (k, -k)).collect();

        assert_eq!(forward, backward);
        assert_eq!(hash_of(&forward), hash_of(&backward));

        let mut changed = backward.clone();
        changed.insert(5, 0);
        assert_ne!(forward, changed);
    }

    #[test]
    pub fn map_contains_value_scans() {
        let map = RedwoodMap::from([(1, "one"), (2, "two")]);

        assert!(map.contains_value(&"two"));
        assert!(!map.contains_value(&"three"));
    }

    #[test]
    pub fn map_debug_lists_entries_in_order() {
        let map = RedwoodMap::from([(2, 'b'), (1, 'a')]);

        assert_eq!(format!("{map:?}"), "{1: 'a', 2: 'b'}");
    }

    #[test]
    pub fn map_from_sorted_iter() {
        let map = RedwoodMap::from_sorted_iter((0..10).map(|k| (k, k))).unwrap();
        assert_eq!(map.len(), 10);
        assert!(map.validate().is_ok());

        assert!(RedwoodMap::from_sorted_iter([(2, ()), (1, ())]).is_err());
    }

    #[test]
    pub fn map_owned_iteration() {
        let mut map = RedwoodMap::from([(3, 'c'), (1, 'a'), (2, 'b')]);

        for value in map.values_mut() {
            *value = value.to_ascii_uppercase();
        }

        let entries: Vec<_> = map.into_iter().collect();
        assert_eq!(entries, [(1, 'A'), (2, 'B'), (3, 'C')]);
    }
}
