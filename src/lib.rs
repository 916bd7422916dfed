//! An ordered container implemented with an AVL tree.
//!
//! [`AvlTree`] keeps its elements sorted and rebalances itself after every
//! insertion and removal, so lookups, insertions and removals all run in
//! O(log n). Every node carries a parent link, which lets the in-order and
//! post-order cursors advance in O(height) without auxiliary storage.
//!
//! Beyond the usual set operations the tree supports [`AvlTree::union_with`],
//! which merges another tree into this one under a caller-supplied inclusion
//! predicate and rebuilds the result balanced in O(n1 + n2).
//!
//! ```
//! use avlset::{AvlTree, Error};
//!
//! let mut tree = AvlTree::new();
//! tree.insert(2)?;
//! tree.insert(1)?;
//! tree.insert(3)?;
//! assert_eq!(tree.get(&2), Ok(&2));
//! assert_eq!(tree.insert(2), Err(Error::KeyAlreadyExists));
//! assert_eq!(tree.remove(&1), Ok(1));
//! assert_eq!(tree.iter().copied().collect::<Vec<_>>(), [2, 3]);
//! # Ok::<(), Error>(())
//! ```

mod error;
mod iter;
mod node;
mod tree;

pub use error::Error;
pub use iter::{Iter, PostorderIter};
pub use tree::AvlTree;
