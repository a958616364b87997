//! Red-black tree based ordered containers.
//!
//! [`Redwood`] is the tree engine: an arena of nodes linked by
//! [`NodeIndex`] handles, so parent back-references never alias owned data.
//! [`RedwoodMap`] and [`RedwoodSet`] are the public adapters built on it;
//! the set is a map whose values are `()`.
//!
//! The containers assume a single writer. Borrowed iterators cannot outlive
//! a mutation, and the detached [`Cursor`] reports structural changes made
//! behind its back as [`RedwoodError::ConcurrentModification`].
//!
//! ```
//! use redwood::RedwoodMap;
//!
//! let mut map = RedwoodMap::new();
//! assert_eq!(map.insert(20, "b"), None);
//! assert_eq!(map.insert(10, "a"), None);
//! assert_eq!(map.insert(20, "c"), Some("b"));
//!
//! let keys: Vec<_> = map.keys().iter().copied().collect();
//! assert_eq!(keys, [10, 20]);
//! ```
extern crate alloc;

mod error;
mod iter;
mod map;
mod node;
#[cfg(feature = "serde")]
mod serde_impl;
mod set;
mod sorted_vec;
mod view;

use core::borrow::Borrow;
use core::cmp::Ordering;
use core::mem;
use core::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use alloc::vec::Vec;

use node::{NodeColor, RedwoodNode, Slot};

pub use error::RedwoodError;
pub use iter::{Cursor, IntoIter, Iter, IterMut, Keys, Nodes, Values, ValuesMut};
pub use map::RedwoodMap;
pub use node::{NodeIndex, Side};
pub use set::{RedwoodSet, SetIntoIter, SetIter};
pub use sorted_vec::SortedVec;
pub use view::{EntrySet, EntrySetMut, KeySet, KeySetMut, ValueCollection};

/// Red-black tree engine.
///
/// Nodes are stored in a vector of slots and refer to each other by index.
/// Slots freed by removals are chained in a free list and reused by later
/// insertions.
///
/// All structural changes go through [`add_node`](Redwood::add_node) and
/// [`remove_node`](Redwood::remove_node); both restore the red-black
/// invariants before returning.
#[derive(Debug)]
pub struct Redwood<K, V> {
    storage: Vec<Slot<K, V>>,
    free_head: Option<NodeIndex>,
    root: Option<NodeIndex>,
    len: usize,
    mod_count: u64,
    /// Distinguishes this tree from every other one, clones included.
    id: u64,
}

/// Source of [`Redwood::id`].
fn next_tree_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(0);

    NEXT_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

impl<K, V> Redwood<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            storage: Vec::new(),
            free_head: None,
            root: None,
            len: 0,
            mod_count: 0,
            id: next_tree_id(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: Vec::with_capacity(capacity),
            ..Self::new()
        }
    }

    /// Reserves arena room for at least `additional` more nodes.
    pub fn reserve(&mut self, additional: usize) {
        self.storage.reserve(additional);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of structural modifications performed so far.
    ///
    /// Value overwrites of existing keys are not structural.
    #[must_use]
    pub fn modification_count(&self) -> u64 {
        self.mod_count
    }

    #[must_use]
    pub fn root(&self) -> Option<NodeIndex> {
        self.root
    }

    /// # Panics
    ///
    /// Panics if `idx` does not designate a live node.
    #[must_use]
    pub fn key(&self, idx: NodeIndex) -> &K {
        &self.node(idx).key
    }

    /// # Panics
    ///
    /// Panics if `idx` does not designate a live node.
    #[must_use]
    pub fn value(&self, idx: NodeIndex) -> &V {
        &self.node(idx).value
    }

    /// # Panics
    ///
    /// Panics if `idx` does not designate a live node.
    pub fn value_mut(&mut self, idx: NodeIndex) -> &mut V {
        &mut self.node_mut(idx).value
    }

    #[must_use]
    pub fn entry(&self, idx: NodeIndex) -> (&K, &V) {
        let node = self.node(idx);
        (&node.key, &node.value)
    }

    /// Lazy in-order walk over node handles, ascending by key.
    pub fn nodes(&self) -> Nodes<'_, K, V> {
        Nodes::new(self)
    }

    /// Handle of the node holding the smallest key.
    #[must_use]
    pub fn first(&self) -> Option<NodeIndex> {
        self.root.map(|root| self.extreme(root, Side::Left))
    }

    /// Handle of the node holding the largest key.
    #[must_use]
    pub fn last(&self) -> Option<NodeIndex> {
        self.root.map(|root| self.extreme(root, Side::Right))
    }

    /// Drops every node and releases the arena's contents.
    pub fn clear(&mut self) {
        log::debug!("clearing tree of {} nodes", self.len);

        self.storage.clear();
        self.free_head = None;
        self.root = None;
        self.len = 0;
        self.mod_count += 1;
    }

    /// Removes the node designated by `idx` and returns its key and value.
    ///
    /// A node with two children first trades its key and value with its
    /// in-order successor, and the successor's slot is the one unlinked. Any
    /// other handle to the successor is therefore invalidated, while `idx`
    /// stays live and now holds the successor's former entry.
    ///
    /// # Panics
    ///
    /// Panics if `idx` does not designate a live node.
    pub fn remove_node(&mut self, idx: NodeIndex) -> (K, V) {
        let mut target = idx;

        let node = self.node(idx);
        if let (Some(_), Some(right)) = (node.left, node.right) {
            let successor = self.extreme(right, Side::Left);
            self.swap_payload(idx, successor);
            target = successor;
        }

        let node = self.node(target);
        let removed_black = !node.is_red();

        match node.left.or(node.right) {
            Some(child) => {
                self.replace_in_parent(target, Some(child));

                if removed_black && !self.node(child).is_red() {
                    self.rebalance_after_remove(child);
                } else {
                    self.set_color(child, NodeColor::Black);
                }
            }
            None if self.root == Some(target) => {
                self.root = None;
            }
            None => {
                // The leaf stays linked while rebalancing so that it can stand
                // in for the missing black node.
                if removed_black {
                    self.rebalance_after_remove(target);
                }

                self.replace_in_parent(target, None);
            }
        }

        self.len -= 1;
        self.mod_count += 1;

        let node = self.release(target);
        (node.key, node.value)
    }

    pub(crate) fn node(&self, idx: NodeIndex) -> &RedwoodNode<K, V> {
        match &self.storage[idx.0] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("node handle {idx:?} designates a vacant slot"),
        }
    }

    pub(crate) fn node_mut(&mut self, idx: NodeIndex) -> &mut RedwoodNode<K, V> {
        match &mut self.storage[idx.0] {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("node handle {idx:?} designates a vacant slot"),
        }
    }

    /// Mutable references to every live value, indexed by arena slot.
    pub(crate) fn values_by_slot(&mut self) -> Vec<Option<(&K, &mut V)>> {
        self.storage
            .iter_mut()
            .map(|slot| match slot {
                Slot::Occupied(node) => Some((&node.key, &mut node.value)),
                Slot::Vacant { .. } => None,
            })
            .collect()
    }

    /// Empties the arena, yielding each live entry with its slot index.
    pub(crate) fn take_slots(&mut self) -> Vec<Option<(K, V)>> {
        self.root = None;
        self.free_head = None;
        self.len = 0;
        self.mod_count += 1;

        mem::take(&mut self.storage)
            .into_iter()
            .map(|slot| match slot {
                Slot::Occupied(node) => Some((node.key, node.value)),
                Slot::Vacant { .. } => None,
            })
            .collect()
    }

    #[inline]
    fn child(&self, idx: NodeIndex, side: Side) -> Option<NodeIndex> {
        self.node(idx).child(side)
    }

    /// Stores `child` in the `side` slot of `idx` and reparents it. The node
    /// previously held by that slot is left untouched.
    fn set_child(&mut self, idx: NodeIndex, side: Side, child: Option<NodeIndex>) {
        *self.node_mut(idx).child_slot_mut(side) = child;

        if let Some(child) = child {
            self.node_mut(child).parent = Some(idx);
        }
    }

    #[inline]
    fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.node(idx).parent
    }

    /// Side of its parent on which `idx` hangs.
    fn side_of(&self, idx: NodeIndex) -> Side {
        let Some(parent) = self.parent(idx) else {
            panic!("the root node {idx:?} has no direction");
        };

        if self.node(parent).right == Some(idx) {
            Side::Right
        } else {
            Side::Left
        }
    }

    fn sibling(&self, idx: NodeIndex) -> Option<NodeIndex> {
        let parent = self.parent(idx)?;
        self.child(parent, self.side_of(idx).opposite())
    }

    /// Absent nodes count as black.
    #[inline]
    fn is_red(&self, idx: Option<NodeIndex>) -> bool {
        idx.is_some_and(|idx| self.node(idx).is_red())
    }

    #[inline]
    fn set_color(&mut self, idx: NodeIndex, color: NodeColor) {
        self.node_mut(idx).color = color;
    }

    fn extreme(&self, mut idx: NodeIndex, side: Side) -> NodeIndex {
        while let Some(child) = self.child(idx, side) {
            idx = child;
        }

        idx
    }

    fn allocate(&mut self, node: RedwoodNode<K, V>) -> NodeIndex {
        match self.free_head {
            Some(idx) => {
                let slot = &mut self.storage[idx.0];
                self.free_head = match slot {
                    Slot::Vacant { next_free } => *next_free,
                    Slot::Occupied(_) => panic!("free list points at occupied slot {idx:?}"),
                };
                *slot = Slot::Occupied(node);

                idx
            }
            None => {
                self.storage.push(Slot::Occupied(node));

                NodeIndex(self.storage.len() - 1)
            }
        }
    }

    fn release(&mut self, idx: NodeIndex) -> RedwoodNode<K, V> {
        let slot = mem::replace(
            &mut self.storage[idx.0],
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        self.free_head = Some(idx);

        match slot {
            Slot::Occupied(node) => node,
            Slot::Vacant { .. } => panic!("node handle {idx:?} released twice"),
        }
    }

    fn swap_payload(&mut self, a: NodeIndex, b: NodeIndex) {
        let (low, high) = if a.0 < b.0 { (a, b) } else { (b, a) };
        let (head, tail) = self.storage.split_at_mut(high.0);

        match (&mut head[low.0], &mut tail[0]) {
            (Slot::Occupied(x), Slot::Occupied(y)) => {
                mem::swap(&mut x.key, &mut y.key);
                mem::swap(&mut x.value, &mut y.value);
            }
            _ => panic!("cannot swap entries of {a:?} and {b:?}: vacant slot"),
        }
    }

    /// Puts `new` where `old` hangs from its parent, or at the root.
    fn replace_in_parent(&mut self, old: NodeIndex, new: Option<NodeIndex>) {
        let parent = self.parent(old);

        match parent {
            None => self.root = new,
            Some(parent) => {
                let side = self.side_of(old);
                *self.node_mut(parent).child_slot_mut(side) = new;
            }
        }

        if let Some(new) = new {
            self.node_mut(new).parent = parent;
        }
    }

    /// Brings up the child of `idx` on `side`; `idx` moves down on the other
    /// side. `Side::Right` is a left rotation.
    fn rotate(&mut self, idx: NodeIndex, side: Side) {
        let Some(pivot) = self.child(idx, side) else {
            panic!("cannot rotate {idx:?}: no {side:?} child to bring up");
        };
        log::trace!("rotating {idx:?}, bringing up {pivot:?}");

        let orphan = self.child(pivot, side.opposite());
        self.set_child(idx, side, orphan);
        self.replace_in_parent(idx, Some(pivot));
        self.set_child(pivot, side.opposite(), Some(idx));
    }

    fn rebalance_after_insert(&mut self, start: NodeIndex) {
        let mut idx = start;

        loop {
            let Some(parent) = self.parent(idx) else {
                self.set_color(idx, NodeColor::Black);
                return;
            };

            if !self.node(parent).is_red() {
                return;
            }

            // A red root only happens transiently; blackening it is enough.
            let Some(grandparent) = self.parent(parent) else {
                self.set_color(parent, NodeColor::Black);
                return;
            };

            let parent_side = self.side_of(parent);
            let uncle = self.child(grandparent, parent_side.opposite());

            if let Some(uncle) = uncle.filter(|&uncle| self.node(uncle).is_red()) {
                log::trace!("red uncle {uncle:?}, recoloring under {grandparent:?}");

                self.set_color(parent, NodeColor::Black);
                self.set_color(uncle, NodeColor::Black);
                self.set_color(grandparent, NodeColor::Red);

                idx = grandparent;
                continue;
            }

            let mut top = parent;
            if self.side_of(idx) != parent_side {
                self.rotate(parent, parent_side.opposite());
                top = idx;
            }

            self.set_color(top, NodeColor::Black);
            self.set_color(grandparent, NodeColor::Red);
            self.rotate(grandparent, parent_side);

            return;
        }
    }

    /// `start` carries one black node too few on every path through it.
    fn rebalance_after_remove(&mut self, start: NodeIndex) {
        let mut idx = start;

        loop {
            let Some(parent) = self.parent(idx) else {
                self.set_color(idx, NodeColor::Black);
                return;
            };

            let side = self.side_of(idx);
            let sibling_side = side.opposite();

            let Some(sibling) = self.sibling(idx) else {
                idx = parent;
                continue;
            };

            if self.node(sibling).is_red() {
                self.set_color(parent, NodeColor::Red);
                self.set_color(sibling, NodeColor::Black);
                self.rotate(parent, sibling_side);

                continue;
            }

            let far = self.child(sibling, sibling_side);
            let near = self.child(sibling, side);

            if !self.is_red(far) && !self.is_red(near) {
                self.set_color(sibling, NodeColor::Red);

                if self.node(parent).is_red() {
                    self.set_color(parent, NodeColor::Black);
                    return;
                }

                idx = parent;
                continue;
            }

            let parent_color = self.node(parent).color;

            match (far.filter(|&far| self.node(far).is_red()), near) {
                (Some(far), _) => {
                    self.set_color(sibling, parent_color);
                    self.set_color(far, NodeColor::Black);
                }
                (None, Some(near)) => {
                    self.set_color(near, parent_color);
                    self.rotate(sibling, side);
                }
                (None, None) => unreachable!("sibling {sibling:?} has no red child"),
            }

            self.set_color(parent, NodeColor::Black);
            self.rotate(parent, sibling_side);

            return;
        }
    }
}

impl<K: Ord, V> Redwood<K, V> {
    /// Handle of the node whose key equals `key`.
    pub fn find_by_key<Q>(&self, key: &Q) -> Option<NodeIndex>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current_node = self.root;

        while let Some(idx) = current_node {
            let curr_node_storage = self.node(idx);

            match key.cmp(curr_node_storage.key.borrow()) {
                Ordering::Less => {
                    current_node = curr_node_storage.left;
                }
                Ordering::Equal => {
                    return Some(idx);
                }
                Ordering::Greater => {
                    current_node = curr_node_storage.right;
                }
            }
        }

        None
    }

    /// Inserts `key` with `value`.
    ///
    /// If the key is already present its value is replaced in place and the
    /// previous value is returned; the tree's shape does not change.
    pub fn add_node(&mut self, key: K, value: V) -> Option<V> {
        let mut current_node = self.root;
        let mut parent_node = None;
        let mut side = Side::Left;

        while let Some(idx) = current_node {
            let curr_node_storage = self.node(idx);

            side = match key.cmp(&curr_node_storage.key) {
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
                Ordering::Equal => {
                    return Some(mem::replace(&mut self.node_mut(idx).value, value));
                }
            };

            parent_node = Some(idx);
            current_node = curr_node_storage.child(side);
        }

        let new_node_pos = self.allocate(RedwoodNode::new_isolated(key, value));

        match parent_node {
            Some(parent) => self.set_child(parent, side, Some(new_node_pos)),
            None => self.root = Some(new_node_pos),
        }

        self.len += 1;
        self.mod_count += 1;

        self.rebalance_after_insert(new_node_pos);

        None
    }

    /// Builds a tree from entries sorted by strictly ascending key, without
    /// comparisons beyond the order check and without rebalancing.
    ///
    /// # Errors
    ///
    /// Returns [`RedwoodError::NotPresorted`] with the position of the first
    /// entry whose key is not greater than its predecessor's.
    pub fn from_sorted_vec(entries: Vec<(K, V)>) -> Result<Self, RedwoodError> {
        if let Some(position) = entries
            .windows(2)
            .position(|pair| pair[0].0 >= pair[1].0)
        {
            return Err(RedwoodError::NotPresorted {
                position: position + 1,
            });
        }

        Ok(Self::link_sorted(entries))
    }

    /// `entries` must already be strictly ascending by key.
    pub(crate) fn link_sorted(entries: Vec<(K, V)>) -> Self {
        let len = entries.len();
        log::debug!("building tree from {len} presorted entries");

        let mut tree = Self {
            storage: entries
                .into_iter()
                .map(|(key, value)| Slot::Occupied(RedwoodNode::new_isolated(key, value)))
                .collect(),
            len,
            mod_count: 1,
            ..Self::new()
        };

        // Every level above this one is complete; nodes on it are red.
        let red_depth = (len + 1).ilog2();
        tree.root = tree.link_balanced(0, len, None, 0, red_depth);

        tree
    }

    fn link_balanced(
        &mut self,
        low: usize,
        high: usize,
        parent: Option<NodeIndex>,
        depth: u32,
        red_depth: u32,
    ) -> Option<NodeIndex> {
        if low >= high {
            return None;
        }

        let mid = low + (high - low) / 2;
        let idx = NodeIndex(mid);

        let left = self.link_balanced(low, mid, Some(idx), depth + 1, red_depth);
        let right = self.link_balanced(mid + 1, high, Some(idx), depth + 1, red_depth);

        let node = self.node_mut(idx);
        node.parent = parent;
        node.left = left;
        node.right = right;
        node.color = if depth == red_depth {
            NodeColor::Red
        } else {
            NodeColor::Black
        };

        Some(idx)
    }

    /// Checks ordering, coloring, black-height, parent links and length.
    /// Returns the black-height of the tree, not counting absent leaves.
    ///
    /// # Errors
    ///
    /// Returns [`RedwoodError::InvariantViolation`] naming the first broken
    /// invariant.
    pub fn validate(&self) -> Result<usize, RedwoodError> {
        let Some(root) = self.root else {
            if self.len != 0 {
                return Err(RedwoodError::InvariantViolation(
                    "empty tree with a non-zero length",
                ));
            }

            return Ok(0);
        };

        let root_node = self.node(root);
        if root_node.parent.is_some() {
            return Err(RedwoodError::InvariantViolation("root has a parent"));
        }
        if root_node.is_red() {
            return Err(RedwoodError::InvariantViolation("root is red"));
        }

        let mut count = 0;
        let black_height = self.validate_subtree(root, None, None, &mut count)?;

        if count != self.len {
            return Err(RedwoodError::InvariantViolation(
                "length does not match the number of reachable nodes",
            ));
        }

        Ok(black_height)
    }

    fn validate_subtree(
        &self,
        idx: NodeIndex,
        lower: Option<&K>,
        upper: Option<&K>,
        count: &mut usize,
    ) -> Result<usize, RedwoodError> {
        *count += 1;
        if *count > self.len {
            return Err(RedwoodError::InvariantViolation(
                "more reachable nodes than the recorded length",
            ));
        }

        let node = self.node(idx);
        if lower.is_some_and(|lower| node.key <= *lower)
            || upper.is_some_and(|upper| node.key >= *upper)
        {
            return Err(RedwoodError::InvariantViolation("keys out of order"));
        }

        let mut heights = [0; 2];
        for (height, side) in heights.iter_mut().zip([Side::Left, Side::Right]) {
            let Some(child) = node.child(side) else {
                continue;
            };

            let child_node = self.node(child);
            if child_node.parent != Some(idx) {
                return Err(RedwoodError::InvariantViolation(
                    "child does not point back at its parent",
                ));
            }
            if node.is_red() && child_node.is_red() {
                return Err(RedwoodError::InvariantViolation("red node with a red child"));
            }

            let (lower, upper) = match side {
                Side::Left => (lower, Some(&node.key)),
                Side::Right => (Some(&node.key), upper),
            };
            *height = self.validate_subtree(child, lower, upper, count)?;
        }

        if heights[0] != heights[1] {
            return Err(RedwoodError::InvariantViolation("unequal black heights"));
        }

        Ok(heights[0] + usize::from(!node.is_red()))
    }
}

impl<K: Clone, V: Clone> Clone for Redwood<K, V> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            free_head: self.free_head,
            root: self.root,
            len: self.len,
            mod_count: self.mod_count,
            id: next_tree_id(),
        }
    }
}

impl<K, V> Default for Redwood<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
