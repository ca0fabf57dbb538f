use indextree::NodeError;

/// Errors that can occur while splicing.
#[derive(Debug, thiserror::Error)]
pub enum SpliceError {
    /// reading an HTML source failed
    #[error("failed to read HTML source: {0}")]
    Parse(#[from] std::io::Error),

    /// the fragment has no content below the parser's synthetic wrappers
    #[error("fragment has no content to splice")]
    EmptyFragment,

    /// a tree mutation broke the attach/detach contract
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Contract violations reported by tree mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// node still has a parent; detach it first
    #[error("node is already attached to a parent")]
    AlreadyAttached,

    /// appending would make a node its own ancestor
    #[error("appending node would create a cycle")]
    Cycle,

    /// node was already removed from its tree
    #[error("node has been removed")]
    Removed,
}

impl From<NodeError> for TreeError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::Removed => TreeError::Removed,
            _ => TreeError::Cycle,
        }
    }
}
