#![cfg(test)]
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::http::{HttpClient, HttpResponse};
use common::CoreError;
use graph::{
    AttributeTagger, GraphError, IdentityError, IdentityTagger, MemoryGraph, MemoryNode, NodeGraph, NodeHandle,
};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

pub fn graph_and_tagger() -> (Arc<MemoryGraph>, AttributeTagger<MemoryGraph>) {
    let graph = Arc::new(MemoryGraph::new());
    let tagger = AttributeTagger::new(Arc::clone(&graph));
    (graph, tagger)
}

/// Tagger whose lookups always fail, as when the tagging plugin is unavailable.
pub struct FailingTagger {
    inner: AttributeTagger<MemoryGraph>,
}

impl FailingTagger {
    pub fn new(graph: Arc<MemoryGraph>) -> Self {
        Self { inner: AttributeTagger::new(graph) }
    }
}

#[async_trait]
impl IdentityTagger<MemoryNode> for FailingTagger {
    async fn assign_identity(&self, node: &MemoryNode, namespace: &Uuid) -> Result<(), IdentityError> {
        self.inner.assign_identity(node, namespace).await
    }

    async fn query_by_identity(&self, _namespace: &Uuid) -> Result<Vec<MemoryNode>, IdentityError> {
        Err(IdentityError::Unavailable("tagging disabled for test".into()))
    }
}

/// Tagger whose lookups find nothing and whose tagging always fails.
pub struct RejectingTagger;

#[async_trait]
impl IdentityTagger<MemoryNode> for RejectingTagger {
    async fn assign_identity(&self, _node: &MemoryNode, _namespace: &Uuid) -> Result<(), IdentityError> {
        Err(IdentityError::Unavailable("tagging rejected for test".into()))
    }

    async fn query_by_identity(&self, _namespace: &Uuid) -> Result<Vec<MemoryNode>, IdentityError> {
        Ok(Vec::new())
    }
}

/// Graph whose nodes refuse to overwrite `ds_*` entries, and optionally to
/// add them, as a host that rejects a write would.
#[derive(Default)]
pub struct FlakyGraph {
    inner: MemoryGraph,
    fail_adds: Arc<AtomicBool>,
}

impl FlakyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_adds(&self, fail: bool) {
        self.fail_adds.store(fail, Ordering::SeqCst);
    }

    fn wrap(&self, inner: MemoryNode) -> FlakyNode {
        FlakyNode { inner, fail_adds: Arc::clone(&self.fail_adds) }
    }
}

#[async_trait]
impl NodeGraph for FlakyGraph {
    type Node = FlakyNode;

    async fn create_node(&self, kind: &str, name: &str) -> Result<FlakyNode, GraphError> {
        Ok(self.wrap(self.inner.create_node(kind, name).await?))
    }

    async fn delete_node(&self, node: &FlakyNode) -> Result<(), GraphError> {
        self.inner.delete_node(&node.inner).await
    }

    async fn nodes(&self) -> Vec<FlakyNode> {
        self.inner.nodes().await.into_iter().map(|n| self.wrap(n)).collect()
    }
}

#[derive(Clone, Debug)]
pub struct FlakyNode {
    inner: MemoryNode,
    fail_adds: Arc<AtomicBool>,
}

impl PartialEq for FlakyNode {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

fn rejected(key: &str) -> GraphError {
    GraphError::Io(format!("host rejected write to {key}"))
}

#[async_trait]
impl NodeHandle for FlakyNode {
    async fn name(&self) -> Result<String, GraphError> {
        self.inner.name().await
    }

    async fn kind(&self) -> Result<String, GraphError> {
        self.inner.kind().await
    }

    async fn is_alive(&self) -> bool {
        self.inner.is_alive().await
    }

    async fn get_attribute(&self, key: &str) -> Result<Option<String>, GraphError> {
        self.inner.get_attribute(key).await
    }

    async fn set_attribute(&self, key: &str, value: &str) -> Result<(), GraphError> {
        if key.starts_with("ds_") {
            return Err(rejected(key));
        }
        self.inner.set_attribute(key, value).await
    }

    async fn add_attribute(&self, key: &str, value: &str) -> Result<(), GraphError> {
        if key.starts_with("ds_") && self.fail_adds.load(Ordering::SeqCst) {
            return Err(rejected(key));
        }
        self.inner.add_attribute(key, value).await
    }

    async fn list_attribute_names(&self) -> Result<Vec<String>, GraphError> {
        self.inner.list_attribute_names().await
    }
}

/// HTTP client answering from a table of canned responses.
/// Unknown URLs fail with a network error. Every request is recorded.
#[derive(Default)]
pub struct ScriptedHttp {
    responses: Mutex<HashMap<String, HttpResponse>>,
    calls: Mutex<Vec<(String, Option<Duration>)>>,
}

impl ScriptedHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn respond(&self, url: &str, status: u16, body: Value) {
        self.responses
            .lock()
            .await
            .insert(url.to_string(), HttpResponse { status, body });
    }

    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.iter().map(|(u, _)| u.clone()).collect()
    }

    pub async fn timeouts(&self) -> Vec<Option<Duration>> {
        self.calls.lock().await.iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<HttpResponse, CoreError> {
        self.calls.lock().await.push((url.to_string(), timeout));
        self.responses
            .lock()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| CoreError::Network(format!("connection refused: {url}")))
    }
}
