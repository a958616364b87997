//! Live views over a [`RedwoodMap`].
//!
//! Views borrow the map instead of copying it: they always reflect the map's
//! current contents, and removals made through a `*Mut` view are removals
//! from the map. Views never insert; `add` and `add_all` fail with
//! [`RedwoodError::UnsupportedOperation`].

use core::borrow::Borrow;

use crate::iter::{Iter, Keys, Values};
use crate::{RedwoodError, RedwoodMap};

fn reject_insertion(operation: &'static str) -> RedwoodError {
    log::debug!("rejected {operation}");

    RedwoodError::UnsupportedOperation(operation)
}

/// Keys of a map, ascending.
pub struct KeySet<'a, K, V> {
    map: &'a RedwoodMap<K, V>,
}

impl<'a, K, V> KeySet<'a, K, V> {
    pub(crate) fn new(map: &'a RedwoodMap<K, V>) -> Self {
        Self { map }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Keys<'a, K, V> {
        Keys {
            inner: self.map.iter(),
        }
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Ord + Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.contains_key(key)
    }
}

impl<'a, K, V> IntoIterator for KeySet<'a, K, V> {
    type Item = &'a K;
    type IntoIter = Keys<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Keys of a map, with removal.
pub struct KeySetMut<'a, K, V> {
    map: &'a mut RedwoodMap<K, V>,
}

impl<'a, K, V> KeySetMut<'a, K, V> {
    pub(crate) fn new(map: &'a mut RedwoodMap<K, V>) -> Self {
        Self { map }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.map.iter(),
        }
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// # Errors
    ///
    /// Always fails: keys cannot be added without a value.
    pub fn add(&mut self, _key: K) -> Result<bool, RedwoodError> {
        Err(reject_insertion("add to a key view"))
    }

    /// # Errors
    ///
    /// Always fails: keys cannot be added without a value.
    pub fn add_all<I>(&mut self, _keys: I) -> Result<bool, RedwoodError>
    where
        I: IntoIterator<Item = K>,
    {
        Err(reject_insertion("add_all to a key view"))
    }
}

impl<K: Ord, V> KeySetMut<'_, K, V> {
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Removes `key` and its value from the map. Returns whether it was
    /// present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.remove_entry(key).is_some()
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.map.retain(|key, _| keep(key));
    }
}

/// Entries of a map, ascending by key.
pub struct EntrySet<'a, K, V> {
    map: &'a RedwoodMap<K, V>,
}

impl<'a, K, V> EntrySet<'a, K, V> {
    pub(crate) fn new(map: &'a RedwoodMap<K, V>) -> Self {
        Self { map }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Iter<'a, K, V> {
        self.map.iter()
    }

    /// Whether `key` is present and mapped to a value equal to `value`.
    pub fn contains<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Ord + Borrow<Q>,
        Q: Ord + ?Sized,
        V: PartialEq,
    {
        self.map.get(key) == Some(value)
    }
}

impl<'a, K, V> IntoIterator for EntrySet<'a, K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Entries of a map, with removal.
pub struct EntrySetMut<'a, K, V> {
    map: &'a mut RedwoodMap<K, V>,
}

impl<'a, K, V> EntrySetMut<'a, K, V> {
    pub(crate) fn new(map: &'a mut RedwoodMap<K, V>) -> Self {
        Self { map }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        self.map.iter()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// # Errors
    ///
    /// Always fails: entries are inserted through the map.
    pub fn add(&mut self, _entry: (K, V)) -> Result<bool, RedwoodError> {
        Err(reject_insertion("add to an entry view"))
    }

    /// # Errors
    ///
    /// Always fails: entries are inserted through the map.
    pub fn add_all<I>(&mut self, _entries: I) -> Result<bool, RedwoodError>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Err(reject_insertion("add_all to an entry view"))
    }
}

impl<K: Ord, V: PartialEq> EntrySetMut<'_, K, V> {
    pub fn contains<Q>(&self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get(key) == Some(value)
    }

    /// Removes the entry only if `key` is mapped to a value equal to `value`.
    pub fn remove<Q>(&mut self, key: &Q, value: &V) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.map.tree.find_by_key(key) {
            Some(idx) if self.map.tree.value(idx) == value => {
                self.map.tree.remove_node(idx);
                true
            }
            _ => false,
        }
    }
}

/// Values of a map, in ascending order of their keys.
pub struct ValueCollection<'a, K, V> {
    map: &'a RedwoodMap<K, V>,
}

impl<'a, K, V> ValueCollection<'a, K, V> {
    pub(crate) fn new(map: &'a RedwoodMap<K, V>) -> Self {
        Self { map }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> Values<'a, K, V> {
        self.map.value_iter()
    }

    /// Linear scan; values are not indexed.
    pub fn contains(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.iter().any(|candidate| candidate == value)
    }
}

impl<'a, K, V> IntoIterator for ValueCollection<'a, K, V> {
    type Item = &'a V;
    type IntoIter = Values<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
