use graph::{GraphError, IdentityError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("cannot mutate a frozen data store")]
    Frozen,
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("data store node missing")]
    NodeMissing,
    #[error("data store must be a NoOp node, found {0}")]
    InvalidNode(String),
    #[error("data not serializable: {0}")]
    NotSerializable(String),
    #[error("stored value for {key} cannot be decoded: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("already registered: {0}")]
    AlreadyRegistered(String),
    #[error("update failed for {name}: {reason}")]
    UpdateFailed { name: String, reason: String },
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
    #[error("graph error: {0}")]
    Graph(GraphError),
}

impl From<GraphError> for StoreError {
    fn from(e: GraphError) -> Self {
        match e {
            GraphError::NodeMissing => Self::NodeMissing,
            other => Self::Graph(other),
        }
    }
}

impl StoreError {
    pub fn corrupt(key: &str, reason: impl ToString) -> Self {
        Self::Corrupt { key: key.to_string(), reason: reason.to_string() }
    }

    pub fn update_failed(name: &str, reason: impl ToString) -> Self {
        Self::UpdateFailed { name: name.to_string(), reason: reason.to_string() }
    }
}
