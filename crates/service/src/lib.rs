//! Key/value persistence on top of host graph nodes.
//! - `storage`: `KeyValueStore`, a JSON store living in a node's attributes.
//! - `cache`: `ApiCache`, timestamped remote API responses in the same storage.
//! - Errors are reported through `errors::StoreError`.

pub mod cache;
pub mod errors;
pub mod storage;
#[cfg(test)]
pub mod test_support;

pub use cache::api_cache::{ApiCache, ApiRegistration, RegisterOptions};
pub use errors::StoreError;
pub use storage::data_store::DataStore;
pub use storage::node_store::KeyValueStore;
