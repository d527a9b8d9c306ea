//! Backends for [`crate::SessionStore`] and [`crate::RealtimeFeed`].

mod memory;

pub use memory::{MemoryStore, MemoryStoreConfig};
