//! Host document errors

/// Result type for document operations
pub type DomResult<T> = Result<T, DomError>;

/// Document operation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Handle does not refer to a live node
    #[error("node not found")]
    NotFound,
    /// Insertion would create a cycle or attach the document node
    #[error("hierarchy request error")]
    HierarchyRequest,
    /// Operation not supported by this kind of node
    #[error("invalid node type")]
    InvalidNodeType,
    /// Reference node is not a child of the given parent
    #[error("node is not a child")]
    NotAChild,
}
