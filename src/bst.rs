use std::{cmp::Ordering, mem};

use log::{debug, trace};

use crate::error::Error;
use crate::node::{Node, NodeId};

/// Strict weak ordering over keys, return true when `a` sorts before `b`.
///
/// Must be irreflexive, asymmetric and transitive, tree behaviour is
/// unspecified otherwise. Non-capturing closures coerce to this type.
pub type LessFn<K> = fn(&K, &K) -> bool;

pub(crate) fn ord_less<K: Ord>(a: &K, b: &K) -> bool {
    a < b
}

/// Bst manage a single instance of an in-memory, unbalanced
/// [binary search tree][bst] with a sentinel node.
///
/// Every node carries a `metadata` slot of type `M` along with its key and
/// value. Metadata stays with the structural position of a node across
/// deletes, which lets balanced trees and augmented trees keep their
/// bookkeeping in it, [`RbTree`](crate::RbTree) stores node color there.
/// Use `()` when no metadata is needed.
///
/// The tree does not rebalance itself, inserting keys in sorted order
/// degrades every operation to O(n).
///
/// [bst]: https://en.wikipedia.org/wiki/Binary_search_tree
pub struct Bst<K, V, M> {
    nodes: Vec<Node<K, V, M>>, // nodes[0] is the sentinel.
    free: Vec<usize>,          // released slots, reused by insert.
    root: NodeId,
    less: LessFn<K>,
}

/// Different ways to construct a new Bst instance.
impl<K, V, M> Bst<K, V, M>
where
    M: Default,
{
    /// Create an empty instance of Bst, ordering keys with `less`.
    pub fn new(less: LessFn<K>) -> Bst<K, V, M> {
        Bst {
            nodes: vec![Node::new_sentinel(M::default())],
            free: vec![],
            root: NodeId::NIL,
            less,
        }
    }
}

impl<K, V, M> Bst<K, V, M>
where
    K: Ord,
    M: Default,
{
    /// Create an empty instance of Bst, ordering keys by their `Ord`.
    pub fn new_ord() -> Bst<K, V, M> {
        Bst::new(ord_less::<K>)
    }
}

impl<K, V, M> Default for Bst<K, V, M>
where
    K: Ord,
    M: Default,
{
    fn default() -> Bst<K, V, M> {
        Bst::new_ord()
    }
}

/// Accessors, none of them mutate the tree.
impl<K, V, M> Bst<K, V, M> {
    #[inline]
    fn slot(&self, n: NodeId) -> &Node<K, V, M> {
        &self.nodes[n.0]
    }

    #[inline]
    fn slot_mut(&mut self, n: NodeId) -> &mut Node<K, V, M> {
        &mut self.nodes[n.0]
    }

    // false for handles outside this arena, like those from another tree.
    #[inline]
    pub(crate) fn is_live(&self, n: NodeId) -> bool {
        n != NodeId::NIL && self.nodes.get(n.0).map_or(false, |slot| slot.is_live())
    }

    /// Return the root node, the sentinel if tree is empty.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Return the sentinel node of this tree.
    #[inline]
    pub fn sentinel(&self) -> NodeId {
        NodeId::NIL
    }

    #[inline]
    pub fn is_nil(&self, n: NodeId) -> bool {
        n == NodeId::NIL
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root == NodeId::NIL
    }

    #[inline]
    pub fn parent(&self, n: NodeId) -> NodeId {
        self.slot(n).parent
    }

    #[inline]
    pub fn left(&self, n: NodeId) -> NodeId {
        self.slot(n).left
    }

    #[inline]
    pub fn right(&self, n: NodeId) -> NodeId {
        self.slot(n).right
    }

    /// Return the other child of `n`'s parent, the sentinel if `n` is root.
    pub fn sibling(&self, n: NodeId) -> NodeId {
        let parent = self.parent(n);
        if parent == NodeId::NIL {
            NodeId::NIL
        } else if self.left(parent) == n {
            self.right(parent)
        } else {
            self.left(parent)
        }
    }

    /// Return key stored in node `n`.
    ///
    /// Panics if `n` is the sentinel or a released node.
    pub fn key(&self, n: NodeId) -> &K {
        match &self.slot(n).entry {
            Some((key, _)) => key,
            None => panic!("key(): {:?} is not a live node", n),
        }
    }

    /// Return value stored in node `n`.
    ///
    /// Panics if `n` is the sentinel or a released node.
    pub fn value(&self, n: NodeId) -> &V {
        match &self.slot(n).entry {
            Some((_, value)) => value,
            None => panic!("value(): {:?} is not a live node", n),
        }
    }

    /// Return mutable reference to the value stored in node `n`. Values
    /// don't take part in ordering, updating them in place is safe.
    ///
    /// Panics if `n` is the sentinel or a released node.
    pub fn value_mut(&mut self, n: NodeId) -> &mut V {
        match &mut self.slot_mut(n).entry {
            Some((_, value)) => value,
            None => panic!("value_mut(): {:?} is not a live node", n),
        }
    }

    #[inline]
    pub fn metadata(&self, n: NodeId) -> &M {
        &self.slot(n).metadata
    }

    // unlike set_metadata() this will also write to the sentinel.
    #[inline]
    pub(crate) fn metadata_mut(&mut self, n: NodeId) -> &mut M {
        &mut self.slot_mut(n).metadata
    }

    /// Node without children.
    #[inline]
    pub fn is_leaf(&self, n: NodeId) -> bool {
        self.left(n) == NodeId::NIL && self.right(n) == NodeId::NIL
    }

    /// Node with at least one child.
    #[inline]
    pub fn is_internal(&self, n: NodeId) -> bool {
        !self.is_leaf(n)
    }

    /// Node with both children.
    #[inline]
    pub fn is_full(&self, n: NodeId) -> bool {
        self.left(n) != NodeId::NIL && self.right(n) != NodeId::NIL
    }

    /// Node with exactly one child.
    #[inline]
    pub fn is_unary(&self, n: NodeId) -> bool {
        (self.left(n) == NodeId::NIL) != (self.right(n) == NodeId::NIL)
    }

    /// Return number of edges from root to `n`, root is at depth 0.
    pub fn depth(&self, mut n: NodeId) -> usize {
        let mut depth = 0;
        while self.parent(n) != NodeId::NIL {
            depth += 1;
            n = self.parent(n);
        }
        depth
    }

    /// Leftmost node in the subtree rooted at `n`.
    pub fn min(&self, mut n: NodeId) -> NodeId {
        while self.left(n) != NodeId::NIL {
            n = self.left(n);
        }
        n
    }

    /// Rightmost node in the subtree rooted at `n`.
    pub fn max(&self, mut n: NodeId) -> NodeId {
        while self.right(n) != NodeId::NIL {
            n = self.right(n);
        }
        n
    }

    /// Return the in-order predecessor of `n`, the sentinel if `n` holds
    /// the smallest key.
    pub fn predecessor(&self, mut n: NodeId) -> NodeId {
        if self.left(n) != NodeId::NIL {
            return self.max(self.left(n));
        }
        let mut p = self.parent(n);
        while p != NodeId::NIL && n != self.right(p) {
            n = p;
            p = self.parent(p);
        }
        p
    }

    /// Return the in-order successor of `n`, the sentinel if `n` holds
    /// the largest key.
    pub fn successor(&self, mut n: NodeId) -> NodeId {
        if self.right(n) != NodeId::NIL {
            return self.min(self.right(n));
        }
        let mut p = self.parent(n);
        while p != NodeId::NIL && n != self.left(p) {
            n = p;
            p = self.parent(p);
        }
        p
    }

    /// In-order traversal of the subtree rooted at `n`, calling `visit`
    /// for each node. Stops as soon as `visit` returns false, in which case
    /// traversal returns false.
    ///
    /// Recursion depth is the height of the subtree, on a skewed tree use
    /// [`traverse_in_order_iter`](Bst::traverse_in_order_iter).
    pub fn traverse_in_order<F>(&self, n: NodeId, mut visit: F) -> bool
    where
        F: FnMut(NodeId) -> bool,
    {
        self.walk_in_order(n, &mut visit)
    }

    fn walk_in_order<F>(&self, n: NodeId, visit: &mut F) -> bool
    where
        F: FnMut(NodeId) -> bool,
    {
        if n == NodeId::NIL {
            return true;
        }
        if !self.walk_in_order(self.left(n), visit) {
            return false;
        }
        if !visit(n) {
            return false;
        }
        self.walk_in_order(self.right(n), visit)
    }

    /// Same as [`traverse_in_order`](Bst::traverse_in_order), walking
    /// with `successor()` instead of recursion.
    pub fn traverse_in_order_iter<F>(&self, n: NodeId, mut visit: F) -> bool
    where
        F: FnMut(NodeId) -> bool,
    {
        if n == NodeId::NIL {
            return true;
        }
        let last = self.max(n);
        let mut node = self.min(n);
        loop {
            if !visit(node) {
                return false;
            }
            if node == last {
                return true;
            }
            node = self.successor(node);
        }
    }

    /// Return an iterator over all entries in sort order.
    pub fn iter(&self) -> Iter<K, V, M> {
        Iter {
            tree: self,
            node: self.min(self.root),
        }
    }
}

/// Read operations that compare keys.
impl<K, V, M> Bst<K, V, M> {
    #[inline]
    fn key_eq(&self, a: &K, b: &K) -> bool {
        !(self.less)(a, b) && !(self.less)(b, a)
    }

    // order of `key` relative to the key in node `n`.
    fn compare(&self, key: &K, n: NodeId) -> Ordering {
        let nkey = self.key(n);
        if (self.less)(key, nkey) {
            Ordering::Less
        } else if (self.less)(nkey, key) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    /// Return node holding `key`.
    pub fn search(&self, key: &K) -> Option<NodeId> {
        let mut node = self.root;
        while node != NodeId::NIL {
            node = match self.compare(key, node) {
                Ordering::Less => self.left(node),
                Ordering::Greater => self.right(node),
                Ordering::Equal => return Some(node),
            };
        }
        None
    }

    /// Return node holding the largest key less than or equal to `key`.
    pub fn floor(&self, key: &K) -> Option<NodeId> {
        let (mut node, mut best) = (self.root, None);
        while node != NodeId::NIL {
            node = match self.compare(key, node) {
                Ordering::Less => self.left(node),
                Ordering::Greater => {
                    best = Some(node);
                    self.right(node)
                }
                Ordering::Equal => return Some(node),
            };
        }
        best
    }

    /// Return node holding the smallest key greater than or equal to `key`.
    pub fn ceiling(&self, key: &K) -> Option<NodeId> {
        let (mut node, mut best) = (self.root, None);
        while node != NodeId::NIL {
            node = match self.compare(key, node) {
                Ordering::Less => {
                    best = Some(node);
                    self.left(node)
                }
                Ordering::Greater => self.right(node),
                Ordering::Equal => return Some(node),
            };
        }
        best
    }

    /// Check whether `n` is a live node of this tree, by looking up its
    /// key and comparing the handle found.
    pub fn contains(&self, n: NodeId) -> bool {
        self.is_live(n) && self.search(self.key(n)) == Some(n)
    }

    /// Validate the tree structure:
    ///
    /// * Sentinel's parent is the sentinel.
    /// * Root's parent is the sentinel.
    /// * Keys are strictly increasing along an in-order walk.
    /// * Every node is exactly one of its parent's children.
    ///
    /// Return the first violation found.
    pub fn is_tree_valid(&self) -> Result<(), Error<K>>
    where
        K: Clone,
    {
        if self.parent(NodeId::NIL) != NodeId::NIL {
            return Err(Error::CorruptSentinel);
        }
        if self.parent(self.root) != NodeId::NIL {
            return Err(Error::RootHasParent);
        }

        let mut prev: Option<NodeId> = None;
        let mut err = None;
        self.traverse_in_order(self.root, |n| {
            if let Some(prev) = prev {
                if !(self.less)(self.key(prev), self.key(n)) {
                    err = Some(Error::OutOfOrder(self.key(n).clone()));
                    return false;
                }
            }
            prev = Some(n);

            let parent = self.parent(n);
            let ok = if parent == NodeId::NIL {
                n == self.root
            } else {
                (self.left(parent) == n) != (self.right(parent) == n)
            };
            if !ok {
                err = Some(Error::ParentChildMismatch(self.key(n).clone()));
            }
            ok
        });
        match err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Write operations on Bst instance.
impl<K, V, M> Bst<K, V, M>
where
    M: Default,
{
    /// Insert {key, value} entry. If key is already present, overwrite its
    /// value in place and return the existing node with false. Otherwise
    /// return the newly attached leaf with true.
    pub fn insert(&mut self, key: K, value: V) -> (NodeId, bool) {
        let (mut parent, mut node) = (NodeId::NIL, self.root);
        let mut go_left = false;
        while node != NodeId::NIL {
            parent = node;
            match self.compare(&key, node) {
                Ordering::Less => {
                    go_left = true;
                    node = self.left(node);
                }
                Ordering::Greater => {
                    go_left = false;
                    node = self.right(node);
                }
                Ordering::Equal => {
                    if let Some((_, old)) = self.slot_mut(node).entry.as_mut() {
                        *old = value;
                    }
                    return (node, false);
                }
            }
        }

        let node = self.alloc(Node::new(key, value, M::default(), parent));
        if parent == NodeId::NIL {
            self.root = node;
        } else if go_left {
            self.slot_mut(parent).left = node;
        } else {
            self.slot_mut(parent).right = node;
        }
        debug!("bst insert {:?} under {:?}", node, parent);
        (node, true)
    }

    /// Delete node `n` and return the node that took its structural
    /// position, which can be the sentinel. The replacement inherits `n`'s
    /// metadata. Return None if `n` is the sentinel or already released.
    pub fn delete(&mut self, n: NodeId) -> Option<NodeId> {
        self.delete_node(n).map(|(replacement, _)| replacement)
    }

    /// Delete key from this instance and return its value. If key is
    /// not present, then delete is effectively a no-op.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let n = self.search(key)?;
        self.delete_node(n).map(|(_, (_, value))| value)
    }

    fn delete_node(&mut self, n: NodeId) -> Option<(NodeId, (K, V))> {
        if !self.is_live(n) {
            return None;
        }

        let (left, right) = (self.left(n), self.right(n));
        let replacement = if left == NodeId::NIL {
            self.transplant(n, right);
            right
        } else if right == NodeId::NIL {
            self.transplant(n, left);
            left
        } else {
            let y = self.min(right);
            if self.parent(y) != n {
                let yright = self.right(y);
                self.transplant(y, yright);
                self.slot_mut(y).right = right;
                self.slot_mut(right).parent = y;
            }
            self.transplant(n, y);
            self.slot_mut(y).left = left;
            self.slot_mut(left).parent = y;
            y
        };

        if replacement != NodeId::NIL {
            let metadata = mem::take(&mut self.slot_mut(n).metadata);
            self.slot_mut(replacement).metadata = metadata;
        }
        let entry = self.release(n)?;
        debug!("bst delete {:?} replaced by {:?}", n, replacement);
        Some((replacement, entry))
    }

    /// Update metadata for node `n`. No-op on the sentinel and on released
    /// nodes.
    pub fn set_metadata(&mut self, n: NodeId, metadata: M) {
        if self.is_live(n) {
            self.slot_mut(n).metadata = metadata;
        }
    }

    /// Replace subtree rooted at `old` with subtree rooted at `new`, in the
    /// root pointer or on the correct side of `old`'s parent. `new`'s parent
    /// is updated unless `new` is the sentinel. Children of `old` and `new`
    /// are left untouched.
    pub fn transplant(&mut self, old: NodeId, new: NodeId) {
        if old == NodeId::NIL {
            return;
        }
        let parent = self.parent(old);
        if parent == NodeId::NIL {
            self.root = new;
        } else if self.left(parent) == old {
            self.slot_mut(parent).left = new;
        } else {
            self.slot_mut(parent).right = new;
        }
        if new != NodeId::NIL {
            self.slot_mut(new).parent = parent;
        }
    }

    //              (i)                       (i)
    //               |                         |
    //               x                         y
    //              / \                       / \
    //             /   \                     /   \
    //            /     \                   /     \
    //          xl       y                 x       yr
    //                  / \               / \
    //                yl   yr           xl   yl
    //
    /// Promote `x`'s right child into `x`'s position. No-op if `x` is the
    /// sentinel or has no right child.
    pub fn rotate_left(&mut self, x: NodeId) {
        if !self.is_live(x) || self.right(x) == NodeId::NIL {
            return;
        }
        let y = self.right(x);
        let yleft = self.left(y);
        self.slot_mut(x).right = yleft;
        if yleft != NodeId::NIL {
            self.slot_mut(yleft).parent = x;
        }
        self.replace_child(x, y);
        self.slot_mut(y).left = x;
        self.slot_mut(x).parent = y;
        trace!("rotate left {:?} -> {:?}", x, y);
    }

    //              (i)                       (i)
    //               |                         |
    //               x                         y
    //              / \                       / \
    //             /   \                     /   \
    //            /     \                   /     \
    //           y       xr               yl       x
    //          / \                               / \
    //        yl   yr                           yr   xr
    //
    /// Promote `x`'s left child into `x`'s position. No-op if `x` is the
    /// sentinel or has no left child.
    pub fn rotate_right(&mut self, x: NodeId) {
        if !self.is_live(x) || self.left(x) == NodeId::NIL {
            return;
        }
        let y = self.left(x);
        let yright = self.right(y);
        self.slot_mut(x).left = yright;
        if yright != NodeId::NIL {
            self.slot_mut(yright).parent = x;
        }
        self.replace_child(x, y);
        self.slot_mut(y).right = x;
        self.slot_mut(x).parent = y;
        trace!("rotate right {:?} -> {:?}", x, y);
    }

    // hang `y` where `x` hangs today, from x's parent or the root pointer.
    fn replace_child(&mut self, x: NodeId, y: NodeId) {
        let parent = self.parent(x);
        self.slot_mut(y).parent = parent;
        if parent == NodeId::NIL {
            self.root = y;
        } else if self.left(parent) == x {
            self.slot_mut(parent).left = y;
        } else {
            self.slot_mut(parent).right = y;
        }
    }

    // unlike transplant() this will also write to the sentinel.
    #[inline]
    pub(crate) fn set_parent(&mut self, n: NodeId, parent: NodeId) {
        self.slot_mut(n).parent = parent;
    }

    // restore the sentinel to its canonical empty shape.
    pub(crate) fn reset_sentinel(&mut self, metadata: M) {
        let sentinel = self.slot_mut(NodeId::NIL);
        sentinel.parent = NodeId::NIL;
        sentinel.left = NodeId::NIL;
        sentinel.right = NodeId::NIL;
        sentinel.metadata = metadata;
    }

    // move entry of node `from` into node `into`, release `from` and return
    // the entry previously held by `into`.
    pub(crate) fn move_entry(&mut self, from: NodeId, into: NodeId) -> Option<(K, V)> {
        let entry = self.release(from)?;
        self.slot_mut(into).entry.replace(entry)
    }

    #[cfg(test)]
    pub(crate) fn swap_entries(&mut self, a: NodeId, b: NodeId) {
        let entry = self.slot_mut(a).entry.take();
        let entry = mem::replace(&mut self.slot_mut(b).entry, entry);
        self.slot_mut(a).entry = entry;
    }

    pub(crate) fn release(&mut self, n: NodeId) -> Option<(K, V)> {
        let entry = self.slot_mut(n).release()?;
        self.free.push(n.0);
        Some(entry)
    }

    fn alloc(&mut self, node: Node<K, V, M>) -> NodeId {
        match self.free.pop() {
            Some(off) => {
                self.nodes[off] = node;
                NodeId(off)
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        }
    }
}

/// Iterator over entries in sort order, walking with `successor()`.
pub struct Iter<'a, K, V, M> {
    tree: &'a Bst<K, V, M>,
    node: NodeId,
}

impl<'a, K, V, M> Iterator for Iter<'a, K, V, M> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.node == NodeId::NIL {
            return None;
        }
        let tree = self.tree;
        let node = self.node;
        self.node = tree.successor(node);
        tree.slot(node).entry.as_ref().map(|(key, value)| (key, value))
    }
}
