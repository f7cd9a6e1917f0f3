//! In-memory node graph that can be persisted as a JSON document.
//!
//! Stands in for the host application's document: nodes keep their creation
//! order and attributes keep their insertion order, and the whole graph can be
//! written to / read from a single JSON file.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{fs, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::errors::GraphError;
use crate::node::{NodeGraph, NodeHandle};

/// Attributes every freshly created node carries, with their initial values.
const BUILTIN_ATTRS: [(&str, &str); 3] = [("label", ""), ("hide_input", "false"), ("tile_color", "0")];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Attribute {
    name: String,
    value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct NodeRecord {
    id: Uuid,
    kind: String,
    name: String,
    attributes: Vec<Attribute>,
}

impl NodeRecord {
    fn attribute_mut(&mut self, key: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == key)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    nodes: Vec<NodeRecord>,
}

impl Document {
    fn node(&self, id: Uuid) -> Result<&NodeRecord, GraphError> {
        self.nodes.iter().find(|n| n.id == id).ok_or(GraphError::NodeMissing)
    }

    fn node_mut(&mut self, id: Uuid) -> Result<&mut NodeRecord, GraphError> {
        self.nodes.iter_mut().find(|n| n.id == id).ok_or(GraphError::NodeMissing)
    }
}

#[derive(Clone, Default)]
pub struct MemoryGraph {
    doc: Arc<RwLock<Document>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a graph from a document file. A missing file yields an empty graph.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let doc: Document = match fs::read(path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| GraphError::Parse(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Document::default(),
            Err(e) => return Err(GraphError::Io(e.to_string())),
        };
        debug!(path = %path.display(), nodes = doc.nodes.len(), "document loaded");
        Ok(Self { doc: Arc::new(RwLock::new(doc)) })
    }

    /// Write the whole graph to `path`, creating parent directories as needed.
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GraphError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.ok();
        }
        let doc = self.doc.read().await;
        let data = serde_json::to_vec_pretty(&*doc).map_err(|e| GraphError::Parse(e.to_string()))?;
        drop(doc);
        fs::write(path, data).await.map_err(|e| GraphError::Io(e.to_string()))?;
        debug!(path = %path.display(), "document saved");
        Ok(())
    }

    fn handle(&self, id: Uuid) -> MemoryNode {
        MemoryNode { id, doc: Arc::clone(&self.doc) }
    }
}

#[async_trait]
impl NodeGraph for MemoryGraph {
    type Node = MemoryNode;

    async fn create_node(&self, kind: &str, name: &str) -> Result<MemoryNode, GraphError> {
        let record = NodeRecord {
            id: Uuid::new_v4(),
            kind: kind.to_string(),
            name: name.to_string(),
            attributes: BUILTIN_ATTRS
                .iter()
                .map(|(n, v)| Attribute { name: n.to_string(), value: v.to_string() })
                .collect(),
        };
        let id = record.id;
        self.doc.write().await.nodes.push(record);
        debug!(%id, kind, name, "node created");
        Ok(self.handle(id))
    }

    async fn delete_node(&self, node: &MemoryNode) -> Result<(), GraphError> {
        let mut doc = self.doc.write().await;
        let before = doc.nodes.len();
        doc.nodes.retain(|n| n.id != node.id);
        if doc.nodes.len() == before {
            return Err(GraphError::NodeMissing);
        }
        debug!(id = %node.id, "node deleted");
        Ok(())
    }

    async fn nodes(&self) -> Vec<MemoryNode> {
        let doc = self.doc.read().await;
        doc.nodes.iter().map(|n| self.handle(n.id)).collect()
    }
}

/// Handle onto a node of a [`MemoryGraph`].
#[derive(Clone)]
pub struct MemoryNode {
    id: Uuid,
    doc: Arc<RwLock<Document>>,
}

impl MemoryNode {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Rename the node, as a host user would.
    pub async fn rename(&self, name: &str) -> Result<(), GraphError> {
        let mut doc = self.doc.write().await;
        doc.node_mut(self.id)?.name = name.to_string();
        Ok(())
    }
}

impl PartialEq for MemoryNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Arc::ptr_eq(&self.doc, &other.doc)
    }
}

impl std::fmt::Debug for MemoryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryNode").field("id", &self.id).finish()
    }
}

#[async_trait]
impl NodeHandle for MemoryNode {
    async fn name(&self) -> Result<String, GraphError> {
        Ok(self.doc.read().await.node(self.id)?.name.clone())
    }

    async fn kind(&self) -> Result<String, GraphError> {
        Ok(self.doc.read().await.node(self.id)?.kind.clone())
    }

    async fn is_alive(&self) -> bool {
        self.doc.read().await.node(self.id).is_ok()
    }

    async fn get_attribute(&self, key: &str) -> Result<Option<String>, GraphError> {
        let doc = self.doc.read().await;
        let node = doc.node(self.id)?;
        Ok(node.attributes.iter().find(|a| a.name == key).map(|a| a.value.clone()))
    }

    async fn set_attribute(&self, key: &str, value: &str) -> Result<(), GraphError> {
        let mut doc = self.doc.write().await;
        let attr = doc
            .node_mut(self.id)?
            .attribute_mut(key)
            .ok_or_else(|| GraphError::AttributeNotFound(key.to_string()))?;
        attr.value = value.to_string();
        Ok(())
    }

    async fn add_attribute(&self, key: &str, value: &str) -> Result<(), GraphError> {
        let mut doc = self.doc.write().await;
        let node = doc.node_mut(self.id)?;
        if node.attribute_mut(key).is_none() {
            node.attributes.push(Attribute { name: key.to_string(), value: value.to_string() });
        }
        Ok(())
    }

    async fn list_attribute_names(&self) -> Result<Vec<String>, GraphError> {
        let doc = self.doc.read().await;
        Ok(doc.node(self.id)?.attributes.iter().map(|a| a.name.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn attributes_keep_insertion_order() -> Result<(), anyhow::Error> {
        let graph = MemoryGraph::new();
        let node = graph.create_node("NoOp", "n").await?;
        node.add_attribute("b", "1").await?;
        node.add_attribute("a", "").await?;
        node.add_attribute("b", "2").await?;

        let names = node.list_attribute_names().await?;
        assert_eq!(names, vec!["label", "hide_input", "tile_color", "b", "a"]);
        assert_eq!(node.get_attribute("a").await?, Some(String::new()));
        // adding an existing attribute keeps its value
        assert_eq!(node.get_attribute("b").await?.as_deref(), Some("1"));
        assert_eq!(node.get_attribute("missing").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn set_requires_existing_attribute() -> Result<(), anyhow::Error> {
        let graph = MemoryGraph::new();
        let node = graph.create_node("NoOp", "n").await?;
        let err = node.set_attribute("nope", "1").await.unwrap_err();
        assert_eq!(err, GraphError::AttributeNotFound("nope".into()));

        node.set_attribute("label", "hello").await?;
        assert_eq!(node.get_attribute("label").await?.as_deref(), Some("hello"));
        Ok(())
    }

    #[tokio::test]
    async fn deleted_node_handles_fail() -> Result<(), anyhow::Error> {
        let graph = MemoryGraph::new();
        let node = graph.create_node("NoOp", "gone").await?;
        let copy = node.clone();
        graph.delete_node(&node).await?;

        assert!(!copy.is_alive().await);
        assert_eq!(copy.get_attribute("label").await, Err(GraphError::NodeMissing));
        assert_eq!(graph.delete_node(&copy).await, Err(GraphError::NodeMissing));
        assert!(graph.node_by_name("gone").await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn document_survives_save_and_load() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("graph_doc_{}.json", Uuid::new_v4()));
        let graph = MemoryGraph::new();
        let node = graph.create_node("NoOp", "persisted").await?;
        node.add_attribute("ds_x", "42").await?;
        graph.save(&tmp).await?;

        let reloaded = MemoryGraph::load(&tmp).await?;
        let found = reloaded.node_by_name("persisted").await.expect("node reloaded");
        assert_eq!(found.id(), node.id());
        assert_eq!(found.get_attribute("ds_x").await?.as_deref(), Some("42"));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn missing_document_loads_empty() -> Result<(), anyhow::Error> {
        let tmp = std::env::temp_dir().join(format!("graph_missing_{}.json", Uuid::new_v4()));
        let graph = MemoryGraph::load(&tmp).await?;
        assert!(graph.nodes().await.is_empty());
        Ok(())
    }
}
