use core::slice;

use alloc::vec::{self, Vec};

/// A vector kept in ascending order by binary-search insertion.
///
/// Equal elements are allowed and keep their insertion order. Insertion and
/// removal shift the tail, so both are O(n); lookups are O(log n).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortedVec<T> {
    items: Vec<T>,
}

impl<T> SortedVec<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Ord> SortedVec<T> {
    /// Inserts `item` after every element equal to it and returns its index.
    pub fn insert(&mut self, item: T) -> usize {
        let index = self.items.partition_point(|probe| probe <= &item);
        self.items.insert(index, item);

        index
    }

    /// Index of the first element equal to `item`.
    pub fn position(&self, item: &T) -> Option<usize> {
        let index = self.items.partition_point(|probe| probe < item);

        (self.items.get(index) == Some(item)).then_some(index)
    }

    pub fn contains(&self, item: &T) -> bool {
        self.position(item).is_some()
    }

    /// Removes the first element equal to `item`.
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let index = self.position(item)?;

        Some(self.items.remove(index))
    }
}

impl<T> Default for SortedVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> FromIterator<T> for SortedVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut items: Vec<T> = iter.into_iter().collect();
        items.sort();

        Self { items }
    }
}

impl<T: Ord> Extend<T> for SortedVec<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

impl<T> IntoIterator for SortedVec<T> {
    type Item = T;
    type IntoIter = vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a SortedVec<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
