use async_trait::async_trait;

use crate::errors::GraphError;

/// A handle onto a single node of the host graph.
///
/// Handles are cheap to clone and may outlive the node they point at; every
/// operation on a deleted node fails with [`GraphError::NodeMissing`].
#[async_trait]
pub trait NodeHandle: Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static {
    async fn name(&self) -> Result<String, GraphError>;
    async fn kind(&self) -> Result<String, GraphError>;
    async fn is_alive(&self) -> bool;
    /// `Ok(None)` when the node has no attribute called `key`.
    async fn get_attribute(&self, key: &str) -> Result<Option<String>, GraphError>;
    /// Overwrite an existing attribute; fails with `AttributeNotFound` otherwise.
    async fn set_attribute(&self, key: &str, value: &str) -> Result<(), GraphError>;
    /// Add an attribute holding `value` in one step, so a failed add never
    /// leaves an empty attribute behind. Adding one that already exists is a no-op.
    async fn add_attribute(&self, key: &str, value: &str) -> Result<(), GraphError>;
    /// Attribute names in host enumeration order.
    async fn list_attribute_names(&self) -> Result<Vec<String>, GraphError>;
}

/// The host graph: creates, enumerates and deletes nodes.
#[async_trait]
pub trait NodeGraph: Send + Sync {
    type Node: NodeHandle;

    async fn create_node(&self, kind: &str, name: &str) -> Result<Self::Node, GraphError>;
    async fn delete_node(&self, node: &Self::Node) -> Result<(), GraphError>;
    /// All live nodes in creation order.
    async fn nodes(&self) -> Vec<Self::Node>;

    async fn node_by_name(&self, name: &str) -> Option<Self::Node> {
        for node in self.nodes().await {
            if node.name().await.ok().as_deref() == Some(name) {
                return Some(node);
            }
        }
        None
    }

    /// Nodes whose attribute `attr` holds exactly `tag`.
    async fn find_nodes_by_identity_tag(
        &self,
        attr: &str,
        tag: &str,
    ) -> Result<Vec<Self::Node>, GraphError> {
        let mut found = Vec::new();
        for node in self.nodes().await {
            if node.get_attribute(attr).await?.as_deref() == Some(tag) {
                found.push(node);
            }
        }
        Ok(found)
    }
}
