use core::fmt;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum NodeColor {
    #[default]
    Red,
    Black,
}

/// Which child slot of a node is meant.
///
/// `Right` plays the role of the `true` direction: a node's direction is
/// `Right` when it hangs off its parent's right slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Handle to a node slot inside a [`Redwood`](crate::Redwood) arena.
///
/// A handle stays valid until the node it designates is removed. Slots are
/// recycled, so a handle kept across a removal may later designate an
/// unrelated node.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub(crate) usize);

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RedwoodNode<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) color: NodeColor,
    pub(crate) parent: Option<NodeIndex>,
    pub(crate) left: Option<NodeIndex>,
    pub(crate) right: Option<NodeIndex>,
}

impl<K, V> RedwoodNode<K, V> {
    pub(crate) fn new_isolated(key: K, value: V) -> Self {
        Self {
            key,
            value,
            color: NodeColor::default(),
            parent: None,
            left: None,
            right: None,
        }
    }

    #[inline]
    pub(crate) fn child(&self, side: Side) -> Option<NodeIndex> {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    #[inline]
    pub(crate) fn child_slot_mut(&mut self, side: Side) -> &mut Option<NodeIndex> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    #[inline]
    pub(crate) fn is_red(&self) -> bool {
        matches!(self.color, NodeColor::Red)
    }
}

/// Arena cell. Vacant cells form a singly linked free list.
#[derive(Debug, Clone)]
pub(crate) enum Slot<K, V> {
    Occupied(RedwoodNode<K, V>),
    Vacant { next_free: Option<NodeIndex> },
}
