use core::iter::FusedIterator;

use alloc::vec::{self, Vec};

use crate::{NodeIndex, Redwood, RedwoodError, RedwoodMap, RedwoodSet};

/// One step of the stack-based in-order walk.
fn next_in_order<K, V>(
    tree: &Redwood<K, V>,
    curr: &mut Option<NodeIndex>,
    stack: &mut Vec<NodeIndex>,
) -> Option<NodeIndex> {
    while let Some(node) = *curr {
        stack.push(node);
        *curr = tree.node(node).left;
    }

    let node = stack.pop()?;
    *curr = tree.node(node).right;

    Some(node)
}

/// In-order walk over the node handles of a [`Redwood`].
pub struct Nodes<'a, K, V> {
    tree: &'a Redwood<K, V>,
    curr: Option<NodeIndex>,
    stack: Vec<NodeIndex>,
    remaining: usize,
}

impl<'a, K, V> Nodes<'a, K, V> {
    pub(crate) fn new(tree: &'a Redwood<K, V>) -> Self {
        Self {
            tree,
            curr: tree.root(),
            stack: Vec::new(),
            remaining: tree.len(),
        }
    }
}

impl<K, V> Iterator for Nodes<'_, K, V> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let node = next_in_order(self.tree, &mut self.curr, &mut self.stack)?;
        self.remaining -= 1;

        Some(node)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Nodes<'_, K, V> {}
impl<K, V> FusedIterator for Nodes<'_, K, V> {}

/// Entries of a map in ascending key order.
pub struct Iter<'a, K, V> {
    nodes: Nodes<'a, K, V>,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(tree: &'a Redwood<K, V>) -> Self {
        Self { nodes: tree.nodes() }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.nodes.tree;
        let node = self.nodes.next()?;

        Some(tree.entry(node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.nodes.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Entries of a map in ascending key order, values mutable.
///
/// Construction walks the tree once and lays out one reference per arena
/// slot, vacant slots included, so creating the iterator costs
/// `O(capacity)` time and memory before the first entry is yielded. Use
/// [`RedwoodMap::get_mut`] for single updates.
pub struct IterMut<'a, K, V> {
    order: vec::IntoIter<NodeIndex>,
    slots: Vec<Option<(&'a K, &'a mut V)>>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(tree: &'a mut Redwood<K, V>) -> Self {
        let order: Vec<_> = tree.nodes().collect();

        Self {
            order: order.into_iter(),
            slots: tree.values_by_slot(),
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.order.next()?;

        self.slots[node.0].take()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// Owning iterator over the entries of a map, ascending by key.
pub struct IntoIter<K, V> {
    order: vec::IntoIter<NodeIndex>,
    slots: Vec<Option<(K, V)>>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(mut tree: Redwood<K, V>) -> Self {
        let order: Vec<_> = tree.nodes().collect();

        Self {
            order: order.into_iter(),
            slots: tree.take_slots(),
        }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.order.next()?;

        self.slots[node.0].take()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

pub struct Keys<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

pub struct Values<'a, K, V> {
    pub(crate) inner: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

pub struct ValuesMut<'a, K, V> {
    pub(crate) inner: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// Detached in-order position over a map or set.
///
/// A cursor holds no borrow of its container, so the container may be
/// mutated while the cursor exists. Each step checks the container's
/// modification count against the one seen when the cursor was created and
/// fails with [`RedwoodError::ConcurrentModification`] once the tree's
/// structure has changed. Overwriting the value of an existing key is not a
/// structural change.
///
/// Stepping a cursor with a container other than the one it was created
/// from fails the same way, clones of that container included.
///
/// ```
/// use redwood::{RedwoodError, RedwoodMap};
///
/// let mut map: RedwoodMap<_, _> = [(1, 'a'), (2, 'b')].into_iter().collect();
/// let mut cursor = map.cursor();
///
/// assert_eq!(cursor.next_entry(&map), Ok(Some((&1, &'a'))));
/// map.insert(3, 'c');
/// assert!(matches!(
///     cursor.next_entry(&map),
///     Err(RedwoodError::ConcurrentModification { .. })
/// ));
/// ```
#[derive(Debug, Clone)]
pub struct Cursor {
    curr: Option<NodeIndex>,
    stack: Vec<NodeIndex>,
    expected: u64,
    tree_id: u64,
}

impl Cursor {
    pub(crate) fn new<K, V>(tree: &Redwood<K, V>) -> Self {
        Self {
            curr: tree.root(),
            stack: Vec::new(),
            expected: tree.modification_count(),
            tree_id: tree.id,
        }
    }

    fn advance<K, V>(&mut self, tree: &Redwood<K, V>) -> Result<Option<NodeIndex>, RedwoodError> {
        let found = tree.modification_count();
        if tree.id != self.tree_id {
            log::debug!("cursor stepped with a tree it was not created from");

            return Err(RedwoodError::ConcurrentModification {
                expected: self.expected,
                found,
            });
        }
        if found != self.expected {
            log::debug!(
                "cursor expected modification {}, tree is at {found}",
                self.expected
            );

            return Err(RedwoodError::ConcurrentModification {
                expected: self.expected,
                found,
            });
        }

        Ok(next_in_order(tree, &mut self.curr, &mut self.stack))
    }

    /// Next entry of `map` in ascending key order.
    ///
    /// # Errors
    ///
    /// Fails if `map` was structurally modified since the cursor was created.
    pub fn next_entry<'a, K, V>(
        &mut self,
        map: &'a RedwoodMap<K, V>,
    ) -> Result<Option<(&'a K, &'a V)>, RedwoodError> {
        Ok(self.advance(&map.tree)?.map(|node| map.tree.entry(node)))
    }

    /// Next element of `set` in ascending order.
    ///
    /// # Errors
    ///
    /// Fails if `set` was structurally modified since the cursor was created.
    pub fn next_element<'a, K>(
        &mut self,
        set: &'a RedwoodSet<K>,
    ) -> Result<Option<&'a K>, RedwoodError> {
        let tree = &set.map.tree;

        Ok(self.advance(tree)?.map(|node| tree.key(node)))
    }

    /// Removal through a cursor is not supported; remove through the
    /// container instead, then start a new cursor.
    ///
    /// # Errors
    ///
    /// Always returns [`RedwoodError::UnsupportedOperation`].
    pub fn remove(&mut self) -> Result<(), RedwoodError> {
        log::debug!("rejected removal through a cursor");

        Err(RedwoodError::UnsupportedOperation("remove through a cursor"))
    }
}
