use crate::errors::StoreError;
use async_trait::async_trait;
use serde_json::Value;

/// Trait abstraction for node-backed key/value storage.
/// Implemented by the plain store and by the API cache, whose writes go
/// through `register`/`update` instead of `set`.
#[async_trait]
pub trait DataStore: Send + Sync {
    fn name(&self) -> &str;
    async fn get(&self, key: &str) -> Result<Value, StoreError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    async fn list_keys(&self) -> Result<Vec<String>, StoreError>;
    async fn is_frozen(&self) -> Result<bool, StoreError>;
    async fn freeze(&self) -> Result<(), StoreError>;
    async fn unfreeze(&self) -> Result<(), StoreError>;
}
