use thiserror::Error;

/// Error enumerates the invariant violations reported by `is_tree_valid()`
/// and `validate()`. Only the first violation found is returned.
#[derive(Error, Debug, PartialEq)]
pub enum Error<K> {
    /// Sentinel's parent link no longer points back to the sentinel.
    #[error("sentinel parent is not the sentinel")]
    CorruptSentinel,
    /// Root's parent link is not the sentinel.
    #[error("root parent is not the sentinel")]
    RootHasParent,
    /// In-order walk found a key not strictly greater than its predecessor.
    #[error("out of order key at node {0:?}")]
    OutOfOrder(K),
    /// Node is not (exclusively) the left or right child of its parent.
    #[error("parent/child mismatch at node {0:?}")]
    ParentChildMismatch(K),
    /// Fatal case for red-black trees, root must be black.
    #[error("root node is not black")]
    RedRoot,
    /// Fatal case for red-black trees, the sentinel must be black.
    #[error("sentinel node is not black")]
    RedSentinel,
    /// Fatal case for red-black trees, red node with a red child.
    #[error("red node {0:?} has a red child")]
    ConsecutiveReds(K),
    /// Fatal case for red-black trees, path from root to the leaf/unary
    /// node `key` counts a different number of blacks than the first path.
    #[error("black count mismatch at node {key:?}: expected {expected} found {found}")]
    UnbalancedBlacks { key: K, expected: usize, found: usize },
}
