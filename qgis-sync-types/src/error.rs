//! Error type used by the crate.

use thiserror::Error;

/// Error returned by [`LayerTree`](crate::LayerTree) mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayerTreeError {
    /// There is no node with the given id in the tree.
    #[error("layer tree node {0} not found")]
    NotFound(String),
    /// The operation is only defined for leaf nodes.
    #[error("layer tree node {0} is a group")]
    NotALeaf(String),
    /// The node cannot be moved to the requested place.
    #[error("invalid move: {0}")]
    InvalidMove(String),
}
