use std::fmt;

/// Handle to a node slot inside a [`Bst`](crate::Bst) or
/// [`RbTree`](crate::RbTree) instance.
///
/// Handles are plain indices, they are only meaningful for the tree that
/// returned them. Every tree has exactly one sentinel handle standing for
/// "no child" and "no parent", check for it with `is_nil()`.
///
/// Handles stay valid until the node they name is released by a delete.
/// Deleting a node with two children in a [`RbTree`](crate::RbTree) moves
/// the successor's entry into the deleted node's slot and releases the
/// successor's slot instead, so a handle to the successor is stale after
/// that call while the handle to the deleted node now names the successor's
/// key. A stale handle reads as a detached node, released slots are reused
/// by later inserts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub(crate) const NIL: NodeId = NodeId(0);
}

/// Node corresponds to a single slot in the tree's arena.
pub(crate) struct Node<K, V, M> {
    pub(crate) entry: Option<(K, V)>, // None for sentinel and released slots
    pub(crate) metadata: M,
    pub(crate) parent: NodeId,
    pub(crate) left: NodeId,
    pub(crate) right: NodeId,
}

impl<K, V, M> Node<K, V, M> {
    pub(crate) fn new_sentinel(metadata: M) -> Node<K, V, M> {
        Node {
            entry: None,
            metadata,
            parent: NodeId::NIL,
            left: NodeId::NIL,
            right: NodeId::NIL,
        }
    }

    pub(crate) fn new(key: K, value: V, metadata: M, parent: NodeId) -> Node<K, V, M> {
        Node {
            entry: Some((key, value)),
            metadata,
            parent,
            left: NodeId::NIL,
            right: NodeId::NIL,
        }
    }

    #[inline]
    pub(crate) fn is_live(&self) -> bool {
        self.entry.is_some()
    }

    // detach links, leaving the slot ready for reuse.
    pub(crate) fn release(&mut self) -> Option<(K, V)> {
        self.parent = NodeId::NIL;
        self.left = NodeId::NIL;
        self.right = NodeId::NIL;
        self.entry.take()
    }
}

/// Color of a red-black node, stored in the node's metadata slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Black,
}

impl Default for Color {
    fn default() -> Color {
        Color::Black
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Black => write!(f, "black"),
        }
    }
}
