use async_trait::async_trait;
use graph::{IdentityTagger, NodeGraph, NodeHandle};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::storage::data_store::DataStore;
use crate::storage::finite::ensure_finite;

/// Prefix separating store entries from the node's own attributes.
pub const DS_PREFIX: &str = "ds_";
/// Control attribute holding the JSON-encoded frozen flag.
pub const FROZEN_ATTR: &str = "nds_frozen";
/// Kind of node every store lives on.
pub const NODE_KIND: &str = "NoOp";
pub const TILE_COLOR: u32 = 4_278_190_335;

/// Identity namespace shared by all plain data stores.
pub const STORE_NAMESPACE: Uuid = Uuid::from_u128(0x356455a5_3e58_47b7_8d37_3bb37610187b);

/// What distinguishes one family of stores from another on the graph.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StoreProfile {
    pub namespace: Uuid,
    pub label: &'static str,
}

pub(crate) const DATA_STORE: StoreProfile = StoreProfile { namespace: STORE_NAMESPACE, label: "DataStore" };

/// JSON key/value store persisted in the attributes of one graph node.
///
/// The node is found again by identity tag plus name, so the store survives a
/// document reload. Entries live in `ds_<key>` attributes; the frozen flag
/// lives in [`FROZEN_ATTR`].
#[derive(Debug, Clone)]
pub struct KeyValueStore<N> {
    name: String,
    node: N,
}

impl<N: NodeHandle> KeyValueStore<N> {
    /// Find the store node called `name`, or create it.
    pub async fn open<G, T>(graph: &G, tagger: &T, name: &str) -> Result<Self, StoreError>
    where
        G: NodeGraph<Node = N>,
        T: IdentityTagger<N> + ?Sized,
    {
        Self::open_with(graph, tagger, name, DATA_STORE).await
    }

    pub(crate) async fn open_with<G, T>(
        graph: &G,
        tagger: &T,
        name: &str,
        profile: StoreProfile,
    ) -> Result<Self, StoreError>
    where
        G: NodeGraph<Node = N>,
        T: IdentityTagger<N> + ?Sized,
    {
        let (node, created) = match Self::resolve(tagger, name, &profile).await {
            Some(node) => {
                debug!(store = %name, "re-attached to existing node");
                (node, false)
            }
            None => {
                let node = graph.create_node(NODE_KIND, name).await?;
                if let Err(e) = Self::init_node(tagger, &node, &profile).await {
                    Self::discard(graph, &node, name).await;
                    return Err(e);
                }
                info!(store = %name, label = profile.label, "created store node");
                (node, true)
            }
        };

        let store = Self { name: name.to_string(), node };
        if let Err(e) = store.assert_layout(profile.label).await {
            if created {
                Self::discard(graph, &store.node, name).await;
            }
            return Err(e);
        }
        Ok(store)
    }

    async fn init_node<T>(tagger: &T, node: &N, profile: &StoreProfile) -> Result<(), StoreError>
    where
        T: IdentityTagger<N> + ?Sized,
    {
        tagger.assign_identity(node, &profile.namespace).await?;
        node.add_attribute(FROZEN_ATTR, &false.to_string()).await?;
        Ok(())
    }

    /// Remove a node this open created but could not finish setting up.
    async fn discard<G>(graph: &G, node: &N, name: &str)
    where
        G: NodeGraph<Node = N>,
    {
        if let Err(e) = graph.delete_node(node).await {
            warn!(store = %name, error = %e, "could not remove half-created store node");
        }
    }

    async fn resolve<T>(tagger: &T, name: &str, profile: &StoreProfile) -> Option<N>
    where
        T: IdentityTagger<N> + ?Sized,
    {
        let nodes = match tagger.query_by_identity(&profile.namespace).await {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(store = %name, error = %e, "identity query failed; treating store as new");
                return None;
            }
        };
        let mut found = None;
        for node in nodes {
            if node.name().await.ok().as_deref() == Some(name) {
                found = Some(node);
            }
        }
        found
    }

    /// Re-apply the cosmetic and control attributes. Idempotent.
    async fn assert_layout(&self, label: &str) -> Result<(), StoreError> {
        let node = self.store().await?;
        self.put_attr(node, "label", label).await?;
        self.put_attr(node, "hide_input", "true").await?;
        self.put_attr(node, "tile_color", &TILE_COLOR.to_string()).await?;
        let frozen = node.get_attribute(FROZEN_ATTR).await?;
        if frozen.map_or(true, |v| v.trim().is_empty()) {
            self.put_attr(node, FROZEN_ATTR, &false.to_string()).await?;
        }
        Ok(())
    }

    /// The backing node, checked to be live and of the expected kind.
    pub async fn store(&self) -> Result<&N, StoreError> {
        if !self.node.is_alive().await {
            return Err(StoreError::NodeMissing);
        }
        let kind = self.node.kind().await?;
        if kind != NODE_KIND {
            return Err(StoreError::InvalidNode(kind));
        }
        Ok(&self.node)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn put_attr(&self, node: &N, attr: &str, value: &str) -> Result<(), StoreError> {
        match node.get_attribute(attr).await? {
            Some(_) => node.set_attribute(attr, value).await?,
            None => node.add_attribute(attr, value).await?,
        }
        Ok(())
    }

    async fn read_attr(&self, attr: &str, key: &str) -> Result<Value, StoreError> {
        let node = self.store().await?;
        let raw = node
            .get_attribute(attr)
            .await?
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| StoreError::corrupt(key, e))
    }

    async fn write_attr<V>(&self, attr: &str, value: &V) -> Result<(), StoreError>
    where
        V: Serialize + ?Sized,
    {
        ensure_finite(value).map_err(|e| StoreError::NotSerializable(e.to_string()))?;
        let encoded = serde_json::to_string(value).map_err(|e| StoreError::NotSerializable(e.to_string()))?;
        let node = self.store().await?;
        self.put_attr(node, attr, &encoded).await
    }

    /// Decoded value stored under `key`.
    pub async fn get(&self, key: &str) -> Result<Value, StoreError> {
        let value = self.read_attr(&ds_attr(key), key).await?;
        debug!(store = %self.name, key, "get");
        Ok(value)
    }

    /// Like [`get`](Self::get), decoded into `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, StoreError> {
        let value = self.get(key).await?;
        serde_json::from_value(value).map_err(|e| StoreError::corrupt(key, e))
    }

    /// Replace the value under `key`. Rejected while the store is frozen.
    pub async fn set<V>(&self, key: &str, value: &V) -> Result<(), StoreError>
    where
        V: Serialize + Sync + ?Sized,
    {
        if self.is_frozen().await? {
            return Err(StoreError::Frozen);
        }
        self.write_attr(&ds_attr(key), value).await?;
        debug!(store = %self.name, key, "set");
        Ok(())
    }

    pub async fn contains_key(&self, key: &str) -> Result<bool, StoreError> {
        let node = self.store().await?;
        Ok(node.get_attribute(&ds_attr(key)).await?.is_some())
    }

    /// Entry keys in host enumeration order.
    pub async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        let node = self.store().await?;
        let keys = node
            .list_attribute_names()
            .await?
            .into_iter()
            .filter_map(|attr| attr.strip_prefix(DS_PREFIX).map(str::to_string))
            .collect();
        Ok(keys)
    }

    pub async fn is_frozen(&self) -> Result<bool, StoreError> {
        match self.read_attr(FROZEN_ATTR, FROZEN_ATTR).await? {
            Value::Bool(frozen) => Ok(frozen),
            other => Err(StoreError::corrupt(FROZEN_ATTR, format!("expected a boolean, found {other}"))),
        }
    }

    pub async fn freeze(&self) -> Result<(), StoreError> {
        self.write_attr(FROZEN_ATTR, &true).await?;
        info!(store = %self.name, "frozen");
        Ok(())
    }

    pub async fn unfreeze(&self) -> Result<(), StoreError> {
        self.write_attr(FROZEN_ATTR, &false).await?;
        info!(store = %self.name, "unfrozen");
        Ok(())
    }

    /// `<KeyValueStore: NAME, Keys: N>` using the node's current name.
    pub async fn describe(&self) -> Result<String, StoreError> {
        let node_name = self.store().await?.name().await?;
        let keys = self.list_keys().await?.len();
        Ok(format!("<KeyValueStore: {node_name}, Keys: {keys}>"))
    }
}

fn ds_attr(key: &str) -> String {
    format!("{DS_PREFIX}{key}")
}

#[async_trait]
impl<N: NodeHandle> DataStore for KeyValueStore<N> {
    fn name(&self) -> &str { self.name() }
    async fn get(&self, key: &str) -> Result<Value, StoreError> { self.get(key).await }
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> { self.set(key, &value).await }
    async fn list_keys(&self) -> Result<Vec<String>, StoreError> { self.list_keys().await }
    async fn is_frozen(&self) -> Result<bool, StoreError> { self.is_frozen().await }
    async fn freeze(&self) -> Result<(), StoreError> { self.freeze().await }
    async fn unfreeze(&self) -> Result<(), StoreError> { self.unfreeze().await }
}
