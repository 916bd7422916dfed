use thiserror::Error;

/// Errors returned by tree operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested key is not in the tree.
    #[error("key not found")]
    KeyNotFound,
    /// The inserted key is already in the tree.
    #[error("key already exists")]
    KeyAlreadyExists,
}
