//! Partitioned, version-tagged response cache.
//!
//! Three logical partitions (static/api/runtime) are namespaced by a
//! deployment version tag and persisted in a single store. The store is a
//! plain key-to-response mapping: staleness policy lives with the callers,
//! not here.

mod storage;
mod traits;

pub use storage::{MemoryStore, SqliteStore};
pub use traits::{CacheNames, CacheStore, StoredResponse};
