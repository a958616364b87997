use core::borrow::Borrow;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;

use crate::iter::{IntoIter, Keys};
use crate::{Cursor, RedwoodError, RedwoodMap};

/// An ordered set, backed by a [`RedwoodMap`] whose values are `()`.
pub struct RedwoodSet<K> {
    pub(crate) map: RedwoodMap<K, ()>,
}

impl<K> RedwoodSet<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: RedwoodMap::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            map: RedwoodMap::with_capacity(capacity),
        }
    }

    pub fn reserve(&mut self, additional: usize) {
        self.map.reserve(additional);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn first(&self) -> Option<&K> {
        self.map.first_key_value().map(|(key, _)| key)
    }

    pub fn last(&self) -> Option<&K> {
        self.map.last_key_value().map(|(key, _)| key)
    }

    pub fn iter(&self) -> SetIter<'_, K> {
        SetIter {
            inner: self.map.keys().iter(),
        }
    }

    /// Detached cursor over the elements; see [`Cursor`].
    pub fn cursor(&self) -> Cursor {
        self.map.cursor()
    }
}

impl<K: Ord> RedwoodSet<K> {
    /// Builds a set from elements in strictly ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`RedwoodError::NotPresorted`] if two neighbouring elements
    /// are out of order or equal.
    pub fn from_sorted_iter<I>(elements: I) -> Result<Self, RedwoodError>
    where
        I: IntoIterator<Item = K>,
    {
        Ok(Self {
            map: RedwoodMap::from_sorted_iter(elements.into_iter().map(|key| (key, ())))?,
        })
    }

    /// Adds `key`; returns `true` if it was not already present.
    pub fn insert(&mut self, key: K) -> bool {
        self.map.insert(key, ()).is_none()
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.contains_key(key)
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.get_key_value(key).map(|(key, _)| key)
    }

    /// Removes `key`; returns `true` if it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.remove_entry(key).is_some()
    }

    pub fn take<Q>(&mut self, key: &Q) -> Option<K>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.map.remove_entry(key).map(|(key, _)| key)
    }

    pub fn pop_first(&mut self) -> Option<K> {
        self.map.pop_first().map(|(key, _)| key)
    }

    pub fn pop_last(&mut self) -> Option<K> {
        self.map.pop_last().map(|(key, _)| key)
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&K) -> bool,
    {
        self.map.retain(|key, _| keep(key));
    }

    /// See [`Redwood::validate`](crate::Redwood::validate).
    ///
    /// # Errors
    ///
    /// Returns [`RedwoodError::InvariantViolation`] if the tree is corrupt.
    pub fn validate(&self) -> Result<usize, RedwoodError> {
        self.map.validate()
    }
}

impl<K> Default for RedwoodSet<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone> Clone for RedwoodSet<K> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl<K: fmt::Debug> fmt::Debug for RedwoodSet<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K: PartialEq> PartialEq for RedwoodSet<K> {
    fn eq(&self, other: &Self) -> bool {
        self.map == other.map
    }
}

impl<K: Eq> Eq for RedwoodSet<K> {}

impl<K: Hash> Hash for RedwoodSet<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.map.hash(state);
    }
}

impl<K: Ord> FromIterator<K> for RedwoodSet<K> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<K: Ord> Extend<K> for RedwoodSet<K> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        self.map.extend(iter.into_iter().map(|key| (key, ())));
    }
}

impl<K: Ord, const N: usize> From<[K; N]> for RedwoodSet<K> {
    fn from(elements: [K; N]) -> Self {
        elements.into_iter().collect()
    }
}

/// Elements of a set in ascending order.
pub struct SetIter<'a, K> {
    inner: Keys<'a, K, ()>,
}

impl<'a, K> Iterator for SetIter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for SetIter<'_, K> {}
impl<K> FusedIterator for SetIter<'_, K> {}

pub struct SetIntoIter<K> {
    inner: IntoIter<K, ()>,
}

impl<K> Iterator for SetIntoIter<K> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for SetIntoIter<K> {}
impl<K> FusedIterator for SetIntoIter<K> {}

impl<K> IntoIterator for RedwoodSet<K> {
    type Item = K;
    type IntoIter = SetIntoIter<K>;

    fn into_iter(self) -> Self::IntoIter {
        SetIntoIter {
            inner: self.map.into_iter(),
        }
    }
}

impl<'a, K> IntoIterator for &'a RedwoodSet<K> {
    type Item = &'a K;
    type IntoIter = SetIter<'a, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::{RedwoodError, RedwoodSet};

    #[test]
    fn set_insert_reports_novelty() {
        let mut set = RedwoodSet::new();

        assert!(set.insert(5));
        assert!(set.insert(3));
        assert!(!set.insert(5));

        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().copied().collect::<Vec<_>>(), [3, 5]);
    }

    #[test]
    fn set_remove_and_contains() {
        let mut set = RedwoodSet::from([1, 2, 3]);

        assert!(set.contains(&2));
        assert!(set.remove(&2));
        assert!(!set.remove(&2));
        assert!(!set.contains(&2));
        assert_eq!(set.take(&3), Some(3));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn set_ends() {
        let mut set: RedwoodSet<_> = [7, 1, 4].into_iter().collect();

        assert_eq!(set.first(), Some(&1));
        assert_eq!(set.last(), Some(&7));
        assert_eq!(set.pop_first(), Some(1));
        assert_eq!(set.pop_last(), Some(7));
        assert_eq!(set.into_iter().collect::<Vec<_>>(), [4]);
    }

    #[test]
    fn set_borrowed_lookup() {
        let set = RedwoodSet::from(["pear".to_string(), "fig".to_string()]);

        assert!(set.contains("fig"));
        assert_eq!(set.get("pear").map(String::as_str), Some("pear"));
    }

    #[test]
    fn set_equality_and_debug() {
        let a = RedwoodSet::from([3, 1, 2]);
        let b: RedwoodSet<_> = (1..=3).collect();

        assert_eq!(a, b);
        assert_eq!(format!("{a:?}"), "{1, 2, 3}");
    }

    #[test]
    fn set_cursor_detects_modification() {
        let mut set = RedwoodSet::from([1, 2, 3]);
        let mut cursor = set.cursor();

        assert_eq!(cursor.next_element(&set), Ok(Some(&1)));
        set.insert(10);
        assert!(matches!(
            cursor.next_element(&set),
            Err(RedwoodError::ConcurrentModification { .. })
        ));
    }

    #[test]
    fn set_from_sorted_iter() {
        let set = RedwoodSet::from_sorted_iter(0..64).unwrap();
        assert!(set.validate().is_ok());
        assert_eq!(set.len(), 64);

        assert_eq!(
            RedwoodSet::from_sorted_iter([1, 1]).unwrap_err(),
            RedwoodError::NotPresorted { position: 1 }
        );
    }
}
