//! Timestamped cache of remote API responses, persisted on a graph node.

pub mod api_cache;
