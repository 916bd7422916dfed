use std::cmp;
use std::fmt;

use crate::error::Error;
use crate::iter::{Iter, PostorderIter};
use crate::node::{Link, LinkPtr, Node, NodePtr};

/// An ordered container implemented with an AVL tree.
///
/// Elements are kept in ascending order and the tree rebalances itself after
/// every insertion and removal. Elements must form a total order; a given
/// element can be stored at most once, except for the equal neighbors a
/// filtered [`union_with`](AvlTree::union_with) is allowed to produce.
pub struct AvlTree<T: Ord> {
    root: Link<T>,
    num_nodes: usize,
}

impl<T: Ord> AvlTree<T> {
    /// Creates an empty tree.
    /// No memory is allocated until the first element is inserted.
    pub fn new() -> Self {
        Self {
            root: None,
            num_nodes: 0,
        }
    }

    /// Returns true if the tree contains no elements.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the number of elements in the tree.
    pub fn len(&self) -> usize {
        self.num_nodes
    }

    /// Returns the height of the tree. A single node has height zero,
    /// as does the empty tree.
    pub fn height(&self) -> usize {
        match self.root {
            None => 0,
            Some(root_ptr) => unsafe { root_ptr.as_ref().height },
        }
    }

    /// Clears the tree, deallocating all memory.
    pub fn clear(&mut self) {
        // Post-order reaches a node only after both children, so each node
        // can be freed as soon as the cursor has moved past it.
        unsafe {
            let mut current = Node::postorder_first(self.root);
            while let Some(node_ptr) = current {
                current = Node::postorder_next(node_ptr);
                Node::destroy(node_ptr);
            }
        }
        self.root = None;
        self.num_nodes = 0;
    }

    /// Returns a reference to the stored element equal to the given one.
    pub fn get(&self, value: &T) -> Result<&T, Error> {
        match self.find(value) {
            Some(node_ptr) => Ok(&unsafe { &*node_ptr.as_ptr() }.value),
            None => Err(Error::KeyNotFound),
        }
    }

    /// Returns true if the tree contains an element equal to the given one.
    pub fn contains(&self, value: &T) -> bool {
        self.find(value).is_some()
    }

    /// Inserts an element into the tree.
    ///
    /// Fails with [`Error::KeyAlreadyExists`] if an equal element is already
    /// present; the tree is left exactly as it was before the call.
    pub fn insert(&mut self, value: T) -> Result<(), Error> {
        let (parent, mut link_ptr) = self.find_insert_pos(&value)?;
        let node_ptr = Node::create(parent, value);
        unsafe {
            *link_ptr.as_mut() = Some(node_ptr);
        }
        self.num_nodes += 1;
        unsafe { self.rebalance_after_insert(node_ptr) };
        Ok(())
    }

    /// Removes the element equal to the given one and returns it.
    ///
    /// Fails with [`Error::KeyNotFound`] if no such element is present; the
    /// tree is left exactly as it was before the call.
    pub fn remove(&mut self, value: &T) -> Result<T, Error> {
        let node_ptr = self.find(value).ok_or(Error::KeyNotFound)?;
        debug_assert!(self.num_nodes >= 1);
        self.unlink_node(node_ptr);
        self.num_nodes -= 1;
        Ok(unsafe { Node::take(node_ptr) })
    }

    /// Gets an iterator over the elements in ascending order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self.root)
    }

    /// Gets an iterator over the elements in post-order, i.e. every element
    /// is yielded only after all elements of both of its subtrees.
    pub fn postorder(&self) -> PostorderIter<'_, T> {
        PostorderIter::new(self.root)
    }

    /// Asserts that the internal tree structure is consistent: parent and
    /// child links agree, cached heights are exact, every node is balanced
    /// and an in-order walk is sorted.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        unsafe {
            // Check root link
            if let Some(root_ptr) = self.root {
                assert!(root_ptr.as_ref().parent.is_none());
            }

            // Check tree nodes
            let mut num_nodes = 0;
            let mut current = self.root.map(|root_ptr| Node::leftmost(root_ptr));
            while let Some(node_ptr) = current {
                let mut height = 0;
                let mut left_height = 0;
                let mut right_height = 0;

                // Check link for left child node.
                // Order is non-strict: a filtered union can leave equal
                // neighbors in the tree.
                if let Some(left_ptr) = node_ptr.as_ref().left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(left_ptr.as_ref().value <= node_ptr.as_ref().value);
                    left_height = left_ptr.as_ref().height + 1;
                    height = cmp::max(height, left_height);
                }

                // Check link for right child node
                if let Some(right_ptr) = node_ptr.as_ref().right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(right_ptr.as_ref().value >= node_ptr.as_ref().value);
                    right_height = right_ptr.as_ref().height + 1;
                    height = cmp::max(height, right_height);
                }

                // Check height cache
                assert_eq!(node_ptr.as_ref().height, height);

                // Check AVL condition (near balance)
                assert!(left_height <= right_height + 1);
                assert!(right_height <= left_height + 1);

                num_nodes += 1;
                current = Node::inorder_next(node_ptr);
            }

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);
        }
    }

    fn find(&self, value: &T) -> Link<T> {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match value.cmp(&node_ptr.as_ref().value) {
                    cmp::Ordering::Equal => break,
                    cmp::Ordering::Less => node_ptr.as_ref().left,
                    cmp::Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    fn find_insert_pos(&mut self, value: &T) -> Result<(Link<T>, LinkPtr<T>), Error> {
        let mut parent: Link<T> = None;
        let mut link_ptr: LinkPtr<T> = unsafe { LinkPtr::new_unchecked(&mut self.root) };
        unsafe {
            while let Some(mut node_ptr) = link_ptr.as_ref() {
                if *value == node_ptr.as_ref().value {
                    return Err(Error::KeyAlreadyExists);
                } else {
                    parent = *link_ptr.as_ref();
                    if *value < node_ptr.as_ref().value {
                        link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().left);
                    } else {
                        link_ptr = LinkPtr::new_unchecked(&mut node_ptr.as_mut().right);
                    }
                }
            }
        }
        Ok((parent, link_ptr))
    }

    fn unlink_node(&mut self, node_ptr: NodePtr<T>) {
        unsafe {
            // Check if node to-unlink has right sub tree
            if let Some(mut min_child_ptr) = node_ptr.as_ref().right {
                // Find in-order successor, the smallest node in the right
                // sub tree
                let mut min_child_parent_ptr = node_ptr;
                while let Some(left_ptr) = min_child_ptr.as_ref().left {
                    min_child_parent_ptr = min_child_ptr;
                    min_child_ptr = left_ptr;
                }

                // Successor is stem or leaf, unlink from tree
                debug_assert!(min_child_ptr.as_ref().left.is_none());
                if min_child_parent_ptr.as_ref().left == Some(min_child_ptr) {
                    min_child_parent_ptr.as_mut().left = min_child_ptr.as_ref().right;
                } else {
                    min_child_parent_ptr.as_mut().right = min_child_ptr.as_ref().right;
                }
                if let Some(mut right_ptr) = min_child_ptr.as_ref().right {
                    right_ptr.as_mut().parent = min_child_ptr.as_ref().parent;
                }

                // Relink successor into the place of the node to-unlink.
                // The node identity is preserved, values are never copied.
                min_child_ptr.as_mut().left = node_ptr.as_ref().left;
                if let Some(mut left_ptr) = node_ptr.as_ref().left {
                    left_ptr.as_mut().parent = Some(min_child_ptr);
                }

                min_child_ptr.as_mut().right = node_ptr.as_ref().right;
                if let Some(mut right_ptr) = node_ptr.as_ref().right {
                    right_ptr.as_mut().parent = Some(min_child_ptr);
                }

                min_child_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(min_child_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(min_child_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(min_child_ptr);
                        }
                    }
                }

                // Parent of the successor might be out of balance now
                let mut rebalance_from = min_child_parent_ptr;
                if rebalance_from == node_ptr {
                    // Parent is node to-unlink and has been replaced by the
                    // successor
                    rebalance_from = min_child_ptr;
                }
                self.rebalance_after_remove(Some(rebalance_from));
            } else {
                // Node to-unlink is stem or leaf, unlink from tree
                debug_assert!(node_ptr.as_ref().right.is_none());
                if let Some(mut left_ptr) = node_ptr.as_ref().left {
                    left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                }
                match node_ptr.as_ref().parent {
                    None => self.root = node_ptr.as_ref().left,
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = node_ptr.as_ref().left;
                        } else {
                            parent_ptr.as_mut().right = node_ptr.as_ref().left
                        }
                        // Parent node might be out of balance now
                        self.rebalance_after_remove(Some(parent_ptr));
                    }
                }
            }
        }
    }

    fn rotate_left(&mut self, mut node_ptr: NodePtr<T>) {
        unsafe {
            if let Some(mut right_ptr) = node_ptr.as_ref().right {
                node_ptr.as_mut().right = right_ptr.as_ref().left;
                if let Some(mut right_left_ptr) = right_ptr.as_mut().left {
                    right_left_ptr.as_mut().parent = Some(node_ptr);
                }

                right_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(right_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(right_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(right_ptr);
                        }
                    }
                }

                right_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(right_ptr);

                Node::adjust_height(node_ptr);
                Node::adjust_height(right_ptr);
            }
        }
    }

    fn rotate_right(&mut self, mut node_ptr: NodePtr<T>) {
        unsafe {
            if let Some(mut left_ptr) = node_ptr.as_ref().left {
                node_ptr.as_mut().left = left_ptr.as_ref().right;
                if let Some(mut right_ptr) = left_ptr.as_ref().right {
                    right_ptr.as_mut().parent = Some(node_ptr);
                }

                left_ptr.as_mut().parent = node_ptr.as_ref().parent;
                match node_ptr.as_ref().parent {
                    None => self.root = Some(left_ptr),
                    Some(mut parent_ptr) => {
                        if parent_ptr.as_ref().left == Some(node_ptr) {
                            parent_ptr.as_mut().left = Some(left_ptr);
                        } else {
                            parent_ptr.as_mut().right = Some(left_ptr);
                        }
                    }
                }

                left_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(left_ptr);

                Node::adjust_height(node_ptr);
                Node::adjust_height(left_ptr);
            }
        }
    }

    /// Rebalances ancestors of a freshly inserted leaf, walking towards the
    /// root. Stops as soon as an ancestor's height is unaffected by the
    /// insertion, or right after the single rotation a single insertion can
    /// require.
    unsafe fn rebalance_after_insert(&mut self, new_leaf: NodePtr<T>) {
        let mut child = new_leaf;
        while let Some(parent_ptr) = child.as_ref().parent {
            if parent_ptr.as_ref().height > child.as_ref().height {
                // Subtree height is unchanged, so all heights above are too
                break;
            }
            let did_rebalance = self.rebalance_node(parent_ptr);
            if did_rebalance {
                break;
            }
            child = parent_ptr;
        }
    }

    /// Rebalances nodes starting from given position all the way up to the
    /// root node. A single removal can require a rotation at every level.
    fn rebalance_after_remove(&mut self, start_from: Link<T>) {
        let mut current = start_from;
        while let Some(node_ptr) = current {
            let parent = unsafe { node_ptr.as_ref().parent };
            self.rebalance_node(node_ptr);
            current = parent;
        }
    }

    /// Restores the AVL condition at the given node if necessary and adjusts
    /// its height. Resulting balance is a height difference of +1, 0 or -1
    /// between the left and right subtree. The initial imbalance must not
    /// exceed 2, which always holds after a single update.
    /// Returns whether rebalancing had been necessary.
    fn rebalance_node(&mut self, node_ptr: NodePtr<T>) -> bool {
        unsafe {
            let left_height = Node::left_height(node_ptr);
            let right_height = Node::right_height(node_ptr);
            debug_assert!(left_height <= right_height + 2);
            debug_assert!(right_height <= left_height + 2);
            if left_height > right_height + 1 {
                // Rebalance right. If the left child leans right, rotate it
                // left first so that a single right rotation suffices.
                let left_ptr = node_ptr.as_ref().left.unwrap();
                if Node::right_height(left_ptr) > Node::left_height(left_ptr) {
                    self.rotate_left(left_ptr);
                }
                self.rotate_right(node_ptr);
                true
            } else if right_height > left_height + 1 {
                // Rebalance left, mirror case
                let right_ptr = node_ptr.as_ref().right.unwrap();
                if Node::left_height(right_ptr) > Node::right_height(right_ptr) {
                    self.rotate_right(right_ptr);
                }
                self.rotate_left(node_ptr);
                true
            } else {
                Node::adjust_height(node_ptr);
                false
            }
        }
    }

    /// Merges two sorted node sequences into one, stable with the left
    /// operand winning ties.
    unsafe fn merge_sorted(lhs: &[NodePtr<T>], rhs: &[NodePtr<T>]) -> Vec<NodePtr<T>> {
        let mut merged = Vec::with_capacity(lhs.len() + rhs.len());
        let (mut i, mut j) = (0, 0);
        while i < lhs.len() && j < rhs.len() {
            if rhs[j].as_ref().value < lhs[i].as_ref().value {
                merged.push(rhs[j]);
                j += 1;
            } else {
                merged.push(lhs[i]);
                i += 1;
            }
        }
        merged.extend_from_slice(&lhs[i..]);
        merged.extend_from_slice(&rhs[j..]);
        merged
    }

    /// Rebuilds a balanced subtree from a sorted node sequence by recursive
    /// midpoint selection. Heights are recomputed on the way up; the result
    /// is balanced by construction, no rotations are needed.
    unsafe fn build_balanced(nodes: &[NodePtr<T>], parent: Link<T>) -> Link<T> {
        if nodes.is_empty() {
            return None;
        }
        let mid = nodes.len() / 2;
        let mut node_ptr = nodes[mid];
        node_ptr.as_mut().parent = parent;
        node_ptr.as_mut().left = Self::build_balanced(&nodes[..mid], Some(node_ptr));
        node_ptr.as_mut().right = Self::build_balanced(&nodes[mid + 1..], Some(node_ptr));
        Node::adjust_height(node_ptr);
        Some(node_ptr)
    }
}

impl<T: Ord + Clone> AvlTree<T> {
    /// Replaces this tree with the union of its own elements and the other
    /// tree's elements, keeping only elements for which the predicate
    /// returns true.
    ///
    /// Surviving elements of this tree are reused without copying; matching
    /// elements of the other tree are cloned. The other tree is only read
    /// and stays valid and independently destructible. The result is rebuilt
    /// balanced in O(n1 + n2).
    ///
    /// The merge does not deduplicate across the two trees: an element
    /// present in both survives twice, as equal neighbors in ascending
    /// order.
    ///
    /// If the predicate or a clone panics after the partition of this
    /// tree's elements, this tree is left empty (the already partitioned
    /// nodes are leaked); the other tree is never affected.
    pub fn union_with<F>(&mut self, other: &Self, keep: F)
    where
        F: Fn(&T) -> bool,
    {
        unsafe {
            // Partition this tree's nodes. Nothing is freed until the walk
            // is complete, because the successor rule climbs back through
            // already visited ancestors.
            let mut kept: Vec<NodePtr<T>> = Vec::with_capacity(self.num_nodes);
            let mut discarded: Vec<NodePtr<T>> = Vec::new();
            let mut current = self.root.map(|root_ptr| Node::leftmost(root_ptr));
            while let Some(node_ptr) = current {
                current = Node::inorder_next(node_ptr);
                if keep(&node_ptr.as_ref().value) {
                    kept.push(node_ptr);
                } else {
                    discarded.push(node_ptr);
                }
            }

            // Detach before freeing anything. Should the predicate or a
            // clone panic below, drop must not walk the old structure,
            // which is about to contain freed nodes.
            self.root = None;
            self.num_nodes = 0;

            for node_ptr in discarded {
                Node::destroy(node_ptr);
            }

            // Copy the matching elements of the other tree into fresh nodes
            let mut copied: Vec<NodePtr<T>> = Vec::new();
            for value in other.iter() {
                if keep(value) {
                    copied.push(Node::create(None, value.clone()));
                }
            }

            let merged = Self::merge_sorted(&kept, &copied);
            self.num_nodes = merged.len();
            self.root = Self::build_balanced(&merged, None);
        }
    }

    unsafe fn clone_subtree(link: Link<T>, parent: Link<T>) -> Link<T> {
        let node_ptr = link?;
        let mut copy_ptr = Node::create(parent, node_ptr.as_ref().value.clone());
        copy_ptr.as_mut().height = node_ptr.as_ref().height;
        copy_ptr.as_mut().left = Self::clone_subtree(node_ptr.as_ref().left, Some(copy_ptr));
        copy_ptr.as_mut().right = Self::clone_subtree(node_ptr.as_ref().right, Some(copy_ptr));
        Some(copy_ptr)
    }
}

impl<T: Ord + Clone> Clone for AvlTree<T> {
    /// Structural copy in O(n); the source tree is not modified.
    fn clone(&self) -> Self {
        Self {
            root: unsafe { Self::clone_subtree(self.root, None) },
            num_nodes: self.num_nodes,
        }
    }
}

impl<T: Ord> Drop for AvlTree<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T: Ord> Default for AvlTree<T> {
    /// Creates an empty tree.
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> PartialEq for AvlTree<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Ord> Eq for AvlTree<T> {}

impl<T: Ord + fmt::Debug> fmt::Debug for AvlTree<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Ord> FromIterator<T> for AvlTree<T> {
    /// Collects an iterator into a tree. Duplicate elements are ignored.
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut tree = Self::new();
        for value in iter {
            let _ = tree.insert(value);
        }
        tree
    }
}

impl<'a, T: Ord> IntoIterator for &'a AvlTree<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
