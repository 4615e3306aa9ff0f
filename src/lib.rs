//! In-memory ordered index built from a sentinel based [`Bst`] engine and a
//! self balancing [`RbTree`] layered on top of it.
//!
//! Nodes live in an arena owned by the tree and are addressed by [`NodeId`]
//! handles, parent links are plain indices. Neither tree does internal
//! locking, share them across threads only under external synchronization.
//!
//! ```
//! use rbtree_index::RbTree;
//!
//! let mut index: RbTree<i64, &str> = RbTree::new_ord();
//! index.insert(10, "ten");
//! index.insert(20, "twenty");
//! let node = index.search(&10).unwrap();
//! assert_eq!(*index.value(node), "ten");
//! assert!(index.delete(node));
//! assert_eq!(index.size(), 1);
//! assert!(index.is_tree_valid().is_ok());
//! ```

mod bst;
mod depth;
mod error;
mod node;
mod rbtree;

pub use crate::bst::{Bst, Iter, LessFn};
pub use crate::depth::Depth;
pub use crate::error::Error;
pub use crate::node::{Color, NodeId};
pub use crate::rbtree::{RbTree, Stats};

#[cfg(test)]
mod rbtree_test;
