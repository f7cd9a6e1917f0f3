//! Storage abstractions for the service layer
//!
//! `KeyValueStore` persists JSON values as attributes of a single host graph
//! node; `DataStore` is the item-access surface shared with the API cache.

pub mod data_store;
mod finite;
pub mod node_store;
