use std::marker::PhantomData;

use crate::node::{Link, Node};

/// An iterator over the elements of a tree in ascending order.
///
/// Advancing follows parent links instead of keeping a stack, so a step is
/// O(height) in the worst case and O(1) amortized over a full pass.
pub struct Iter<'a, T> {
    current: Link<T>,
    marker: PhantomData<&'a T>,
}

/// An iterator over the elements of a tree in post-order.
///
/// Every element is yielded only after all elements of both of its subtrees,
/// which is the order the tree itself uses to destroy nodes.
pub struct PostorderIter<'a, T> {
    current: Link<T>,
    marker: PhantomData<&'a T>,
}

impl<'a, T> Iter<'a, T> {
    pub(crate) fn new(root: Link<T>) -> Self {
        Self {
            current: root.map(|root_ptr| unsafe { Node::leftmost(root_ptr) }),
            marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;
    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.current?;
        unsafe {
            self.current = Node::inorder_next(node_ptr);
            Some(&(*node_ptr.as_ptr()).value)
        }
    }
}

// Auto derived clone would have an unnecessary T: Clone bound
impl<'a, T> Clone for Iter<'a, T> {
    fn clone(&self) -> Self {
        Self {
            current: self.current,
            marker: PhantomData,
        }
    }
}

impl<'a, T> PostorderIter<'a, T> {
    pub(crate) fn new(root: Link<T>) -> Self {
        Self {
            current: unsafe { Node::postorder_first(root) },
            marker: PhantomData,
        }
    }
}

impl<'a, T> Iterator for PostorderIter<'a, T> {
    type Item = &'a T;
    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.current?;
        unsafe {
            self.current = Node::postorder_next(node_ptr);
            Some(&(*node_ptr.as_ptr()).value)
        }
    }
}

// Auto derived clone would have an unnecessary T: Clone bound
impl<'a, T> Clone for PostorderIter<'a, T> {
    fn clone(&self) -> Self {
        Self {
            current: self.current,
            marker: PhantomData,
        }
    }
}
