use std::cmp;
use std::ptr::NonNull;

pub(crate) type NodePtr<T> = NonNull<Node<T>>;
pub(crate) type Link<T> = Option<NodePtr<T>>;
pub(crate) type LinkPtr<T> = NonNull<Link<T>>;

/// A tree node. Owns its children; the parent link is for navigation only.
pub(crate) struct Node<T> {
    pub(crate) value: T,
    pub(crate) left: Link<T>,
    pub(crate) right: Link<T>,
    pub(crate) parent: Link<T>,
    pub(crate) height: usize,
}

impl<T> Node<T> {
    pub(crate) fn create(parent: Link<T>, value: T) -> NodePtr<T> {
        let boxed = Box::new(Node {
            value,
            parent,
            left: None,
            right: None,
            height: 0,
        });
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    pub(crate) unsafe fn destroy(node_ptr: NodePtr<T>) {
        drop(Box::from_raw(node_ptr.as_ptr()));
    }

    /// Frees the node and returns its value.
    pub(crate) unsafe fn take(node_ptr: NodePtr<T>) -> T {
        let node = *Box::from_raw(node_ptr.as_ptr());
        node.value
    }

    pub(crate) unsafe fn left_height(node_ptr: NodePtr<T>) -> usize {
        match node_ptr.as_ref().left {
            None => 0,
            Some(left_ptr) => left_ptr.as_ref().height + 1,
        }
    }

    pub(crate) unsafe fn right_height(node_ptr: NodePtr<T>) -> usize {
        match node_ptr.as_ref().right {
            None => 0,
            Some(right_ptr) => right_ptr.as_ref().height + 1,
        }
    }

    pub(crate) unsafe fn adjust_height(mut node_ptr: NodePtr<T>) {
        node_ptr.as_mut().height = cmp::max(
            Self::left_height(node_ptr),
            Self::right_height(node_ptr),
        );
    }

    pub(crate) unsafe fn leftmost(node_ptr: NodePtr<T>) -> NodePtr<T> {
        let mut current = node_ptr;
        while let Some(left_ptr) = current.as_ref().left {
            current = left_ptr;
        }
        current
    }

    /// In-order successor: leftmost node of the right subtree if there is
    /// one, otherwise the first ancestor reached from a left child.
    pub(crate) unsafe fn inorder_next(node_ptr: NodePtr<T>) -> Link<T> {
        if let Some(right_ptr) = node_ptr.as_ref().right {
            return Some(Self::leftmost(right_ptr));
        }
        let mut current = node_ptr;
        while let Some(parent_ptr) = current.as_ref().parent {
            if parent_ptr.as_ref().left == Some(current) {
                return Some(parent_ptr);
            }
            current = parent_ptr;
        }
        None
    }

    /// First node in post-order: descend left, then right if there is no
    /// left child, until a node without a right child is reached.
    pub(crate) unsafe fn postorder_first(link: Link<T>) -> Link<T> {
        let mut current = link?;
        loop {
            while let Some(left_ptr) = current.as_ref().left {
                current = left_ptr;
            }
            match current.as_ref().right {
                Some(right_ptr) => current = right_ptr,
                None => return Some(current),
            }
        }
    }

    /// Post-order successor. A node is reached only after both of its
    /// children, which is what makes this walk safe for destruction.
    pub(crate) unsafe fn postorder_next(node_ptr: NodePtr<T>) -> Link<T> {
        let parent_ptr = node_ptr.as_ref().parent?;
        if parent_ptr.as_ref().right == Some(node_ptr) || parent_ptr.as_ref().right.is_none() {
            Some(parent_ptr)
        } else {
            Self::postorder_first(parent_ptr.as_ref().right)
        }
    }
}
