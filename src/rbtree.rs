use std::mem;

use log::{debug, trace};
use rand::Rng;

use crate::bst::{ord_less, Bst, Iter, LessFn};
use crate::depth::Depth;
use crate::error::Error;
use crate::node::{Color, Node, NodeId};

/// RbTree manage a single instance of in-memory index using
/// [red-black][rbtree] tree.
///
/// It is a [`Bst`] with node color kept in the metadata slot. Only the read
/// operations of the underlying tree are exposed, structural mutators like
/// `transplant`, `rotate_left`, `rotate_right` and `set_metadata` are not
/// reachable through RbTree since they would break color invariants.
///
/// Deleting a node with two children moves the successor's entry into the
/// deleted node's slot, refer to [`NodeId`] for the handle contract.
///
/// [rbtree]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
pub struct RbTree<K, V> {
    tree: Bst<K, V, Color>,
    n_count: usize, // number of entries in the tree.
}

/// Different ways to construct a new RbTree instance.
impl<K, V> RbTree<K, V> {
    /// Create an empty instance of RbTree, ordering keys with `less`.
    pub fn new(less: LessFn<K>) -> RbTree<K, V> {
        let mut tree = Bst::new(less);
        tree.reset_sentinel(Color::Black);
        RbTree { tree, n_count: 0 }
    }

    /// Create a new instance of RbTree and load it with entries from
    /// `iter`. Later entries overwrite earlier entries with the same key.
    pub fn load_from<I>(less: LessFn<K>, iter: I) -> RbTree<K, V>
    where
        I: Iterator<Item = (K, V)>,
    {
        let mut rbt = RbTree::new(less);
        for (key, value) in iter {
            rbt.insert(key, value);
        }
        rbt
    }
}

impl<K, V> RbTree<K, V>
where
    K: Ord,
{
    /// Create an empty instance of RbTree, ordering keys by their `Ord`.
    pub fn new_ord() -> RbTree<K, V> {
        RbTree::new(ord_less::<K>)
    }
}

impl<K, V> Default for RbTree<K, V>
where
    K: Ord,
{
    fn default() -> RbTree<K, V> {
        RbTree::new_ord()
    }
}

/// Maintenance API.
impl<K, V> RbTree<K, V> {
    /// Return number of entries in this instance, in O(1).
    #[inline]
    pub fn size(&self) -> usize {
        self.n_count
    }

    /// Check whether this index is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_count == 0
    }

    /// Return quickly with basic statisics, only entries() and
    /// node_size() are valid with this statisics.
    pub fn stats(&self) -> Stats {
        Stats::new(self.n_count, mem::size_of::<Node<K, V, Color>>())
    }

    #[cfg(test)]
    pub(crate) fn as_bst_mut(&mut self) -> &mut Bst<K, V, Color> {
        &mut self.tree
    }
}

/// Write operations on RbTree instance.
impl<K, V> RbTree<K, V> {
    /// Insert {key, value} entry. If key is already present, overwrite its
    /// value in place and return the existing node with false, tree shape
    /// is left untouched. Otherwise return the new node with true.
    pub fn insert(&mut self, key: K, value: V) -> (NodeId, bool) {
        let (node, inserted) = self.tree.insert(key, value);
        if !inserted {
            return (node, false);
        }
        self.set_color(node, Color::Red);
        self.insert_fixup(node);
        self.n_count += 1;
        debug!("rbtree insert {:?}, size {}", node, self.n_count);
        (node, true)
    }

    /// Delete node `n` from the tree. Return false if `n` is the sentinel
    /// or an already released node.
    pub fn delete(&mut self, n: NodeId) -> bool {
        self.delete_node(n).is_some()
    }

    /// Delete key from this instance and return its value. If key is
    /// not present, then delete is effectively a no-op.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let n = self.tree.search(key)?;
        self.delete_node(n).map(|(_, value)| value)
    }

    fn delete_node(&mut self, z: NodeId) -> Option<(K, V)> {
        if !self.tree.is_live(z) {
            return None;
        }

        // y is the node spliced out of the tree, x takes its place.
        let y = if self.is_nil(self.left(z)) || self.is_nil(self.right(z)) {
            z
        } else {
            self.tree.successor(z)
        };
        let x = if !self.is_nil(self.left(y)) {
            self.left(y)
        } else {
            self.right(y)
        };

        // x can be the sentinel, its parent link is needed by delete_fixup.
        let yparent = self.parent(y);
        self.tree.transplant(y, x);
        self.tree.set_parent(x, yparent);

        let ycolor = self.color(y);
        let entry = if y != z {
            self.tree.move_entry(y, z)
        } else {
            self.tree.release(y)
        };

        if ycolor == Color::Black {
            self.delete_fixup(x);
        }
        self.tree.reset_sentinel(Color::Black);
        self.n_count -= 1;
        debug!("rbtree delete {:?} spliced {:?}, size {}", z, y, self.n_count);
        entry
    }

    fn insert_fixup(&mut self, mut z: NodeId) {
        while self.is_red(self.parent(z)) {
            let p = self.parent(z);
            let g = self.parent(p);
            if p == self.left(g) {
                let u = self.right(g);
                if self.is_red(u) {
                    trace!("insert-fixup case-1 at {:?}", z);
                    self.set_color(p, Color::Black);
                    self.set_color(u, Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                } else {
                    if z == self.right(p) {
                        trace!("insert-fixup case-2 at {:?}", z);
                        z = p;
                        self.tree.rotate_left(z);
                    }
                    trace!("insert-fixup case-3 at {:?}", z);
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.tree.rotate_right(g);
                }
            } else {
                let u = self.left(g);
                if self.is_red(u) {
                    trace!("insert-fixup case-1 (mirror) at {:?}", z);
                    self.set_color(p, Color::Black);
                    self.set_color(u, Color::Black);
                    self.set_color(g, Color::Red);
                    z = g;
                } else {
                    if z == self.left(p) {
                        trace!("insert-fixup case-2 (mirror) at {:?}", z);
                        z = p;
                        self.tree.rotate_right(z);
                    }
                    trace!("insert-fixup case-3 (mirror) at {:?}", z);
                    let p = self.parent(z);
                    let g = self.parent(p);
                    self.set_color(p, Color::Black);
                    self.set_color(g, Color::Red);
                    self.tree.rotate_left(g);
                }
            }
        }
        let root = self.root();
        self.set_color(root, Color::Black);
    }

    // x carries an extra black, push it up or absorb it with rotations.
    fn delete_fixup(&mut self, mut x: NodeId) {
        while x != self.root() && self.is_black(x) {
            let p = self.parent(x);
            if x == self.left(p) {
                let mut w = self.right(p);
                if self.is_red(w) {
                    trace!("delete-fixup case-1 at {:?}", x);
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.tree.rotate_left(p);
                    w = self.right(self.parent(x));
                }
                if self.is_black(self.left(w)) && self.is_black(self.right(w)) {
                    trace!("delete-fixup case-2 at {:?}", x);
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.is_black(self.right(w)) {
                        trace!("delete-fixup case-3 at {:?}", x);
                        self.set_color(self.left(w), Color::Black);
                        self.set_color(w, Color::Red);
                        self.tree.rotate_right(w);
                        w = self.right(self.parent(x));
                    }
                    trace!("delete-fixup case-4 at {:?}", x);
                    let p = self.parent(x);
                    self.set_color(w, self.color(p));
                    self.set_color(p, Color::Black);
                    self.set_color(self.right(w), Color::Black);
                    self.tree.rotate_left(p);
                    x = self.root();
                }
            } else {
                let mut w = self.left(p);
                if self.is_red(w) {
                    trace!("delete-fixup case-1 (mirror) at {:?}", x);
                    self.set_color(w, Color::Black);
                    self.set_color(p, Color::Red);
                    self.tree.rotate_right(p);
                    w = self.left(self.parent(x));
                }
                if self.is_black(self.right(w)) && self.is_black(self.left(w)) {
                    trace!("delete-fixup case-2 (mirror) at {:?}", x);
                    self.set_color(w, Color::Red);
                    x = self.parent(x);
                } else {
                    if self.is_black(self.left(w)) {
                        trace!("delete-fixup case-3 (mirror) at {:?}", x);
                        self.set_color(self.right(w), Color::Black);
                        self.set_color(w, Color::Red);
                        self.tree.rotate_left(w);
                        w = self.left(self.parent(x));
                    }
                    trace!("delete-fixup case-4 (mirror) at {:?}", x);
                    let p = self.parent(x);
                    self.set_color(w, self.color(p));
                    self.set_color(p, Color::Black);
                    self.set_color(self.left(w), Color::Black);
                    self.tree.rotate_right(p);
                    x = self.root();
                }
            }
        }
        self.set_color(x, Color::Black);
    }

    #[inline]
    fn is_red(&self, n: NodeId) -> bool {
        !self.is_nil(n) && self.color(n) == Color::Red
    }

    #[inline]
    fn is_black(&self, n: NodeId) -> bool {
        !self.is_red(n)
    }

    // sentinel stays black, colors are never written to it.
    #[inline]
    fn set_color(&mut self, n: NodeId, color: Color) {
        if !self.is_nil(n) {
            *self.tree.metadata_mut(n) = color;
        }
    }
}

/// Read operations on RbTree instance. These are the same as for [`Bst`].
impl<K, V> RbTree<K, V> {
    /// Return the root node, the sentinel if tree is empty.
    #[inline]
    pub fn root(&self) -> NodeId {
        self.tree.root()
    }

    /// Return the sentinel node of this tree.
    #[inline]
    pub fn sentinel(&self) -> NodeId {
        self.tree.sentinel()
    }

    /// Check whether `n` is the sentinel.
    #[inline]
    pub fn is_nil(&self, n: NodeId) -> bool {
        self.tree.is_nil(n)
    }

    /// Parent of `n`, the sentinel for root.
    #[inline]
    pub fn parent(&self, n: NodeId) -> NodeId {
        self.tree.parent(n)
    }

    /// Left child of `n`.
    #[inline]
    pub fn left(&self, n: NodeId) -> NodeId {
        self.tree.left(n)
    }

    /// Right child of `n`.
    #[inline]
    pub fn right(&self, n: NodeId) -> NodeId {
        self.tree.right(n)
    }

    /// Other child of `n`'s parent.
    #[inline]
    pub fn sibling(&self, n: NodeId) -> NodeId {
        self.tree.sibling(n)
    }

    /// Panics if `n` is the sentinel or a released node.
    #[inline]
    pub fn key(&self, n: NodeId) -> &K {
        self.tree.key(n)
    }

    /// Panics if `n` is the sentinel or a released node.
    #[inline]
    pub fn value(&self, n: NodeId) -> &V {
        self.tree.value(n)
    }

    /// Panics if `n` is the sentinel or a released node.
    #[inline]
    pub fn value_mut(&mut self, n: NodeId) -> &mut V {
        self.tree.value_mut(n)
    }

    /// Color of `n` by reference, refer to [`color`](RbTree::color).
    #[inline]
    pub fn metadata(&self, n: NodeId) -> &Color {
        self.tree.metadata(n)
    }

    /// Return color of node `n`, the sentinel is always black.
    #[inline]
    pub fn color(&self, n: NodeId) -> Color {
        *self.tree.metadata(n)
    }

    /// Node without children.
    #[inline]
    pub fn is_leaf(&self, n: NodeId) -> bool {
        self.tree.is_leaf(n)
    }

    /// Node with at least one child.
    #[inline]
    pub fn is_internal(&self, n: NodeId) -> bool {
        self.tree.is_internal(n)
    }

    /// Node with both children.
    #[inline]
    pub fn is_full(&self, n: NodeId) -> bool {
        self.tree.is_full(n)
    }

    /// Node with exactly one child.
    #[inline]
    pub fn is_unary(&self, n: NodeId) -> bool {
        self.tree.is_unary(n)
    }

    /// Number of edges from root to `n`.
    #[inline]
    pub fn depth(&self, n: NodeId) -> usize {
        self.tree.depth(n)
    }

    /// Left most node in the subtree rooted at `n`.
    #[inline]
    pub fn min(&self, n: NodeId) -> NodeId {
        self.tree.min(n)
    }

    /// Right most node in the subtree rooted at `n`.
    #[inline]
    pub fn max(&self, n: NodeId) -> NodeId {
        self.tree.max(n)
    }

    /// In-order predecessor of `n`, the sentinel if `n` is the minimum.
    #[inline]
    pub fn predecessor(&self, n: NodeId) -> NodeId {
        self.tree.predecessor(n)
    }

    /// In-order successor of `n`, the sentinel if `n` is the maximum.
    #[inline]
    pub fn successor(&self, n: NodeId) -> NodeId {
        self.tree.successor(n)
    }

    /// Node holding `key`, if any.
    pub fn search(&self, key: &K) -> Option<NodeId> {
        self.tree.search(key)
    }

    /// Node holding the largest key less than or equal to `key`.
    pub fn floor(&self, key: &K) -> Option<NodeId> {
        self.tree.floor(key)
    }

    /// Node holding the smallest key greater than or equal to `key`.
    pub fn ceiling(&self, key: &K) -> Option<NodeId> {
        self.tree.ceiling(key)
    }

    /// Check whether `n` is a live node of this tree.
    pub fn contains(&self, n: NodeId) -> bool {
        self.tree.contains(n)
    }

    /// Get the value for key.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.tree.search(key).map(|n| self.tree.value(n))
    }

    /// Recursive in-order traversal of the subtree rooted at `n`, refer
    /// to [`Bst::traverse_in_order`].
    pub fn traverse_in_order<F>(&self, n: NodeId, visit: F) -> bool
    where
        F: FnMut(NodeId) -> bool,
    {
        self.tree.traverse_in_order(n, visit)
    }

    /// Non-recursive variant of [`traverse_in_order`](RbTree::traverse_in_order).
    pub fn traverse_in_order_iter<F>(&self, n: NodeId, visit: F) -> bool
    where
        F: FnMut(NodeId) -> bool,
    {
        self.tree.traverse_in_order_iter(n, visit)
    }

    /// Return an iterator over all entries in this instance.
    pub fn iter(&self) -> Iter<K, V, Color> {
        self.tree.iter()
    }

    /// Return a random entry from this index.
    pub fn random<R: Rng>(&self, rng: &mut R) -> Option<(&K, &V)> {
        let mut node = self.root();
        if self.is_nil(node) {
            return None;
        }

        let mut at_depth = rng.gen::<u8>() % 40;
        loop {
            let next = match rng.gen::<u8>() % 2 {
                0 => self.left(node),
                _ => self.right(node),
            };
            if at_depth == 0 || self.is_nil(next) {
                break Some((self.key(node), self.value(node)));
            }
            at_depth -= 1;
            node = next;
        }
    }
}

/// Validation.
impl<K, V> RbTree<K, V>
where
    K: Clone,
{
    /// Check the binary search tree structure, refer to
    /// [`Bst::is_tree_valid`], then check red-black rules:
    ///
    /// * Root is black.
    /// * Sentinel is black.
    /// * No red node has a red child.
    /// * Every path from root to the sentinel counts the same number of
    ///   black nodes.
    pub fn is_tree_valid(&self) -> Result<(), Error<K>> {
        self.validate().map(|_| ())
    }

    /// Same checks as [`is_tree_valid`](RbTree::is_tree_valid), additionally
    /// return full statistics on the tree. Refer to [`Stats`] for more
    /// information.
    pub fn validate(&self) -> Result<Stats, Error<K>> {
        self.tree.is_tree_valid()?;

        if self.is_red(self.root()) {
            return Err(Error::RedRoot);
        }
        if self.color(self.sentinel()) != Color::Black {
            return Err(Error::RedSentinel);
        }

        let mut depths = Depth::new();
        let mut blacks: Option<usize> = None;
        let mut err = None;
        self.traverse_in_order(self.root(), |n| {
            if self.is_red(n) && (self.is_red(self.left(n)) || self.is_red(self.right(n))) {
                err = Some(Error::ConsecutiveReds(self.key(n).clone()));
                return false;
            }
            // only leaf and unary nodes end a root-to-sentinel path.
            if !(self.is_leaf(n) || self.is_unary(n)) {
                return true;
            }

            let (mut node, mut nb, mut depth) = (n, 0, 0);
            while !self.is_nil(node) {
                if self.is_black(node) {
                    nb += 1;
                }
                node = self.parent(node);
                depth += 1;
            }
            depths.sample(depth - 1);

            match blacks {
                None => blacks = Some(nb),
                Some(expected) if expected != nb => {
                    err = Some(Error::UnbalancedBlacks {
                        key: self.key(n).clone(),
                        expected,
                        found: nb,
                    });
                    return false;
                }
                Some(_) => (),
            }
            true
        });
        if let Some(err) = err {
            return Err(err);
        }

        let mut stats = self.stats();
        stats.set_blacks(blacks.unwrap_or(0));
        stats.set_depths(depths);
        Ok(stats)
    }
}

/// Statistics on [`RbTree`] tree. Serves two purpose:
///
/// * To get partial but quick statistics via [`RbTree::stats`] method.
/// * To get full statisics via [`RbTree::validate`] method.
#[derive(Default, Debug)]
pub struct Stats {
    entries: usize, // number of entries in the tree.
    node_size: usize,
    blacks: Option<usize>,
    depths: Option<Depth>,
}

impl Stats {
    fn new(entries: usize, node_size: usize) -> Stats {
        Stats {
            entries,
            node_size,
            blacks: Default::default(),
            depths: Default::default(),
        }
    }

    #[inline]
    fn set_blacks(&mut self, blacks: usize) {
        self.blacks = Some(blacks)
    }

    #[inline]
    fn set_depths(&mut self, depths: Depth) {
        self.depths = Some(depths)
    }

    /// Return number entries in [`RbTree`] instance.
    #[inline]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Return node-size, including over-head for `RbTree<K,V>`. Although
    /// the node overhead is constant, the node size varies based on
    /// key and value types.
    #[inline]
    pub fn node_size(&self) -> usize {
        self.node_size
    }

    /// Return number of black nodes from root to the sentinel, the same
    /// along every path.
    #[inline]
    pub fn blacks(&self) -> Option<usize> {
        self.blacks
    }

    /// Return [`Depth`] statistics, None when tree is empty or when
    /// obtained via [`RbTree::stats`].
    pub fn depths(&self) -> Option<Depth> {
        match &self.depths {
            Some(depths) if depths.samples() > 0 => Some(depths.clone()),
            _ => None,
        }
    }
}
