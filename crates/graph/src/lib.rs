//! Host graph collaborators for node-backed stores.
//! - `NodeGraph` / `NodeHandle`: the node and attribute API a store needs.
//! - `IdentityTagger`: persistent, rename-proof identity tags.
//! - `MemoryGraph`: an in-memory graph persisted as a JSON document.

pub mod errors;
pub mod identity;
pub mod memory;
pub mod node;

pub use errors::{GraphError, IdentityError};
pub use identity::{AttributeTagger, IdentityTagger, IDENTITY_ATTR};
pub use memory::{MemoryGraph, MemoryNode};
pub use node::{NodeGraph, NodeHandle};
