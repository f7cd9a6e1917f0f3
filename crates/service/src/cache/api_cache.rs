use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use common::http::HttpClient;
use graph::{IdentityTagger, NodeGraph, NodeHandle};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::storage::data_store::DataStore;
use crate::storage::node_store::{KeyValueStore, StoreProfile};

/// Identity namespace shared by all API caches.
pub const CACHE_NAMESPACE: Uuid = Uuid::from_u128(0x9b1f7a0e_52c4_4d1e_a3a8_6c0e2f1d7b44);

const API_CACHE: StoreProfile = StoreProfile { namespace: CACHE_NAMESPACE, label: "ApiCache" };

/// Stored form of a registration: `[url, timestamp, payload]`.
#[derive(Serialize, Deserialize)]
struct RawEntry(String, Option<String>, Value);

/// A registered API and the result of its last successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEntry", into = "RawEntry")]
pub struct ApiRegistration {
    pub url: String,
    /// ISO-8601 UTC time of the last successful fetch.
    pub timestamp: Option<String>,
    pub payload: Option<Value>,
}

impl ApiRegistration {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string(), timestamp: None, payload: None }
    }
}

impl From<RawEntry> for ApiRegistration {
    fn from(RawEntry(url, timestamp, payload): RawEntry) -> Self {
        let payload = match payload {
            Value::Null => None,
            v => Some(v),
        };
        Self { url, timestamp, payload }
    }
}

impl From<ApiRegistration> for RawEntry {
    fn from(r: ApiRegistration) -> Self {
        RawEntry(r.url, r.timestamp, r.payload.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Fetch immediately after registering.
    pub auto_update: bool,
    /// Silently overwrite an existing registration instead of failing.
    pub ignore_if_exists: bool,
}

impl Default for RegisterOptions {
    fn default() -> Self {
        Self { auto_update: true, ignore_if_exists: true }
    }
}

/// Cache of remote JSON APIs, stored on its own graph node.
///
/// Entries are only written through [`register`](Self::register) and
/// [`update`](Self::update); item reads return the cached payload.
pub struct ApiCache<N> {
    inner: KeyValueStore<N>,
    http: Arc<dyn HttpClient>,
    timeout: Option<Duration>,
}

impl<N: NodeHandle> ApiCache<N> {
    pub async fn open<G, T>(
        graph: &G,
        tagger: &T,
        name: &str,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self, StoreError>
    where
        G: NodeGraph<Node = N>,
        T: IdentityTagger<N> + ?Sized,
    {
        let inner = KeyValueStore::open_with(graph, tagger, name, API_CACHE).await?;
        Ok(Self { inner, http, timeout: None })
    }

    /// Per-request timeout overriding the HTTP client's default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn store(&self) -> Result<&N, StoreError> {
        self.inner.store().await
    }

    /// Direct writes are not allowed on a cache.
    pub async fn set(&self, key: &str, _value: &Value) -> Result<(), StoreError> {
        warn!(cache = %self.name(), key, "rejected direct write");
        Err(StoreError::UnsupportedOperation(
            "API caches are written through register() and update()".to_string(),
        ))
    }

    /// Cached payload for `name`; `Null` until the first successful update.
    pub async fn get(&self, name: &str) -> Result<Value, StoreError> {
        Ok(self.registration(name).await?.payload.unwrap_or(Value::Null))
    }

    pub async fn registration(&self, name: &str) -> Result<ApiRegistration, StoreError> {
        self.inner.get_as(name).await
    }

    pub async fn register(&self, name: &str, url: &str, opts: RegisterOptions) -> Result<(), StoreError> {
        if self.inner.is_frozen().await? {
            return Err(StoreError::Frozen);
        }
        if !opts.ignore_if_exists {
            match self.inner.get(name).await {
                Ok(_) => return Err(StoreError::AlreadyRegistered(name.to_string())),
                Err(StoreError::KeyNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.inner.set(name, &ApiRegistration::new(url)).await?;
        info!(cache = %self.name(), api = name, url, "registered");

        if opts.auto_update {
            self.update(&[name]).await?;
        }
        Ok(())
    }

    /// Fetch `names` (all registered names when empty) in order.
    ///
    /// Stops at the first failure; entries refreshed before it keep their new
    /// payload and later names are not attempted.
    pub async fn update(&self, names: &[&str]) -> Result<(), StoreError> {
        if self.inner.is_frozen().await? {
            return Err(StoreError::Frozen);
        }
        let names = self.resolve_names(names).await?;
        for name in &names {
            let registration = self.registration(name).await?;
            let resp = self
                .http
                .get(&registration.url, self.timeout)
                .await
                .map_err(|e| StoreError::update_failed(name, e))?;
            if !resp.is_success() {
                warn!(cache = %self.name(), api = %name, status = resp.status, "update failed");
                return Err(StoreError::update_failed(name, format!("HTTP status {}", resp.status)));
            }

            let refreshed = ApiRegistration {
                url: registration.url,
                timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
                payload: Some(resp.body),
            };
            self.inner.set(name, &refreshed).await?;
            debug!(cache = %self.name(), api = %name, "updated");
        }
        Ok(())
    }

    /// `(name, timestamp)` pairs for `names`, or for every registered name.
    pub async fn timestamp(&self, names: &[&str]) -> Result<Vec<(String, Option<String>)>, StoreError> {
        let names = self.resolve_names(names).await?;
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let registration = self.registration(&name).await?;
            out.push((name, registration.timestamp));
        }
        Ok(out)
    }

    async fn resolve_names(&self, names: &[&str]) -> Result<Vec<String>, StoreError> {
        if names.is_empty() {
            self.inner.list_keys().await
        } else {
            Ok(names.iter().map(|n| n.to_string()).collect())
        }
    }

    pub async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_keys().await
    }

    pub async fn is_frozen(&self) -> Result<bool, StoreError> {
        self.inner.is_frozen().await
    }

    pub async fn freeze(&self) -> Result<(), StoreError> {
        self.inner.freeze().await
    }

    pub async fn unfreeze(&self) -> Result<(), StoreError> {
        self.inner.unfreeze().await
    }

    pub async fn describe(&self) -> Result<String, StoreError> {
        let node_name = self.store().await?.name().await?;
        let keys = self.list_keys().await?.len();
        Ok(format!("<ApiCache: {node_name}, Keys: {keys}>"))
    }
}

#[async_trait]
impl<N: NodeHandle> DataStore for ApiCache<N> {
    fn name(&self) -> &str { self.name() }
    async fn get(&self, key: &str) -> Result<Value, StoreError> { self.get(key).await }
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError> { self.set(key, &value).await }
    async fn list_keys(&self) -> Result<Vec<String>, StoreError> { self.list_keys().await }
    async fn is_frozen(&self) -> Result<bool, StoreError> { self.is_frozen().await }
    async fn freeze(&self) -> Result<(), StoreError> { self.freeze().await }
    async fn unfreeze(&self) -> Result<(), StoreError> { self.unfreeze().await }
}
