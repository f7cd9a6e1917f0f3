use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node no longer exists in the graph")]
    NodeMissing,
    #[error("attribute not found: {0}")]
    AttributeNotFound(String),
    #[error("document io error: {0}")]
    Io(String),
    #[error("document parse error: {0}")]
    Parse(String),
}

/// Failure of the identity-tagging mechanism itself, as opposed to
/// "no node carries this tag" which is an empty query result.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity tagging unavailable: {0}")]
    Unavailable(String),
    #[error("identity tagging failed: {0}")]
    Graph(#[from] GraphError),
}
