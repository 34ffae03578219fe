//! Core types and the storage trait for the response cache.

use chrono::{DateTime, Utc};
use color_eyre::Result;

/// A stored response with its cache metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
  pub status: u16,
  pub content_type: String,
  pub body: Vec<u8>,
  /// When the entry was written. `None` means the entry carries no
  /// timestamp and is treated as infinitely stale.
  pub cached_at: Option<DateTime<Utc>>,
  /// Logical endpoint name for API entries. The cleanup pass uses it to
  /// look up the entry's TTL.
  pub endpoint: Option<String>,
}

/// Partition names for one deployment version.
///
/// All three partitions are namespaced by the version tag. Changing the tag
/// orphans the previous partitions; activation drops anything that no
/// longer matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheNames {
  version: String,
}

impl CacheNames {
  pub fn new(version: impl Into<String>) -> Self {
    Self {
      version: version.into(),
    }
  }

  /// Partition for scripts, styles, and documents.
  pub fn static_assets(&self) -> String {
    format!("sbgw-static-{}", self.version)
  }

  /// Partition for cacheable API responses.
  pub fn api(&self) -> String {
    format!("sbgw-api-{}", self.version)
  }

  /// Partition reserved for responses cached opportunistically at runtime.
  pub fn runtime(&self) -> String {
    format!("sbgw-runtime-{}", self.version)
  }

  /// Whether `name` belongs to this version's partition set.
  pub fn contains(&self, name: &str) -> bool {
    name == self.static_assets() || name == self.api() || name == self.runtime()
  }
}

/// Trait for partitioned response storage backends.
///
/// Keys are opaque strings; partitions come into being on first write.
/// Writes are discrete puts with last-write-wins semantics on conflicting
/// keys, so the store is safe for concurrent use without extra coordination
/// at the call sites.
pub trait CacheStore: Send + Sync {
  /// Look up an entry.
  fn get(&self, partition: &str, key: &str) -> Result<Option<StoredResponse>>;

  /// Store an entry, replacing any previous one under the same key.
  fn put(&self, partition: &str, key: &str, response: &StoredResponse) -> Result<()>;

  /// Remove an entry. Returns whether one existed.
  fn delete(&self, partition: &str, key: &str) -> Result<bool>;

  /// All keys currently stored in a partition.
  fn keys(&self, partition: &str) -> Result<Vec<String>>;

  /// All partitions that currently hold entries.
  fn partitions(&self) -> Result<Vec<String>>;

  /// Remove a partition and everything in it.
  fn drop_partition(&self, partition: &str) -> Result<()>;
}
