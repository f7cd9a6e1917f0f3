use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::errors::IdentityError;
use crate::node::{NodeGraph, NodeHandle};

/// Hidden attribute holding a node's identity namespace.
pub const IDENTITY_ATTR: &str = "nds_uuid";

/// Persistent tagging of nodes, independent of their display names.
#[async_trait]
pub trait IdentityTagger<N: NodeHandle>: Send + Sync {
    async fn assign_identity(&self, node: &N, namespace: &Uuid) -> Result<(), IdentityError>;
    async fn query_by_identity(&self, namespace: &Uuid) -> Result<Vec<N>, IdentityError>;
}

/// Tags nodes by writing the namespace into [`IDENTITY_ATTR`].
#[derive(Clone)]
pub struct AttributeTagger<G> {
    graph: Arc<G>,
}

impl<G: NodeGraph> AttributeTagger<G> {
    pub fn new(graph: Arc<G>) -> Self {
        Self { graph }
    }
}

#[async_trait]
impl<G> IdentityTagger<G::Node> for AttributeTagger<G>
where
    G: NodeGraph + 'static,
{
    async fn assign_identity(&self, node: &G::Node, namespace: &Uuid) -> Result<(), IdentityError> {
        let tag = namespace.to_string();
        if node.get_attribute(IDENTITY_ATTR).await?.is_none() {
            node.add_attribute(IDENTITY_ATTR, &tag).await?;
        } else {
            node.set_attribute(IDENTITY_ATTR, &tag).await?;
        }
        debug!(%namespace, "identity assigned");
        Ok(())
    }

    async fn query_by_identity(&self, namespace: &Uuid) -> Result<Vec<G::Node>, IdentityError> {
        let nodes = self
            .graph
            .find_nodes_by_identity_tag(IDENTITY_ATTR, &namespace.to_string())
            .await?;
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGraph;

    #[tokio::test]
    async fn tagged_nodes_are_found_by_namespace_only() -> Result<(), anyhow::Error> {
        let graph = Arc::new(MemoryGraph::new());
        let tagger = AttributeTagger::new(Arc::clone(&graph));
        let ns = Uuid::new_v4();
        let other = Uuid::new_v4();

        let a = graph.create_node("NoOp", "a").await?;
        let b = graph.create_node("NoOp", "b").await?;
        graph.create_node("NoOp", "untagged").await?;
        tagger.assign_identity(&a, &ns).await?;
        tagger.assign_identity(&b, &other).await?;

        let found = tagger.query_by_identity(&ns).await?;
        assert_eq!(found, vec![a.clone()]);

        // re-tagging moves the node to the new namespace
        tagger.assign_identity(&a, &other).await?;
        assert!(tagger.query_by_identity(&ns).await?.is_empty());
        assert_eq!(tagger.query_by_identity(&other).await?.len(), 2);
        Ok(())
    }
}
