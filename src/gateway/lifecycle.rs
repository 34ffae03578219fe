//! Install, activate, and cleanup passes over the cache partitions.

use chrono::Utc;
use color_eyre::Result;
use std::sync::Arc;

use crate::cache::{CacheNames, CacheStore};

use super::keys::cache_key;
use super::policy::TtlPolicy;
use super::upstream::UpstreamClient;

/// Partition lifecycle: pre-warm on install, evict foreign versions on
/// activate, garbage-collect expired API entries on demand.
pub struct Lifecycle<S: CacheStore> {
  store: Arc<S>,
  names: CacheNames,
  policy: TtlPolicy,
}

impl<S: CacheStore> Lifecycle<S> {
  pub fn new(store: Arc<S>, names: CacheNames, policy: TtlPolicy) -> Self {
    Self {
      store,
      names,
      policy,
    }
  }

  /// Pre-warm the static partition from the asset manifest.
  ///
  /// Per-asset failures are logged and skipped: one bad asset must not
  /// keep the gateway from taking over.
  pub async fn install(
    &self,
    upstream: &UpstreamClient,
    asset_origin: &str,
    manifest: &[String],
  ) -> Result<()> {
    let base = asset_origin.trim_end_matches('/');

    let fetches = manifest.iter().map(|path| {
      let url = format!("{}{}", base, path);
      async move {
        let result = upstream.get(&url).await;
        (url, result)
      }
    });
    let results = futures::future::join_all(fetches).await;

    let partition = self.names.static_assets();
    let now = Utc::now();
    let mut warmed = 0usize;

    for (url, result) in results {
      match result {
        Ok(fetched) if fetched.is_success() => {
          let entry = fetched.to_entry(now, None);
          match self.store.put(&partition, &cache_key("GET", &url), &entry) {
            Ok(()) => warmed += 1,
            Err(e) => tracing::warn!("Failed to store pre-warmed asset {}: {}", url, e),
          }
        }
        Ok(fetched) => {
          tracing::warn!("Pre-warm fetch for {} returned status {}", url, fetched.status)
        }
        Err(e) => tracing::warn!("Pre-warm fetch for {} failed: {}", url, e),
      }
    }

    tracing::info!("Install pre-warmed {}/{} static assets", warmed, manifest.len());
    Ok(())
  }

  /// Drop every partition that does not belong to the current version.
  pub fn activate(&self) -> Result<()> {
    for partition in self.store.partitions()? {
      if !self.names.contains(&partition) {
        tracing::info!("Dropping cache partition from prior version: {}", partition);
        self.store.drop_partition(&partition)?;
      }
    }

    Ok(())
  }

  /// Coarse garbage collection over the API partition: evict entries aged
  /// past twice their endpoint's TTL. Returns the number evicted.
  ///
  /// Malformed entries count as infinitely stale and are evicted rather
  /// than aborting the pass.
  pub fn cleanup(&self) -> Result<usize> {
    let partition = self.names.api();
    let now = Utc::now();
    let mut evicted = 0usize;

    for key in self.store.keys(&partition)? {
      let entry = match self.store.get(&partition, &key) {
        Ok(Some(entry)) => entry,
        Ok(None) => continue,
        Err(e) => {
          tracing::warn!("Cleanup could not read entry {}: {}", key, e);
          continue;
        }
      };

      if self
        .policy
        .evictable(entry.endpoint.as_deref(), entry.cached_at, now)
      {
        match self.store.delete(&partition, &key) {
          Ok(_) => evicted += 1,
          Err(e) => tracing::warn!("Cleanup could not delete entry {}: {}", key, e),
        }
      }
    }

    Ok(evicted)
  }
}

impl<S: CacheStore> Clone for Lifecycle<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      names: self.names.clone(),
      policy: self.policy.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{MemoryStore, StoredResponse};
  use chrono::Duration;
  use std::collections::HashMap;

  const TTL_MS: u64 = 900_000;

  fn policy() -> TtlPolicy {
    let mut ttls = HashMap::new();
    ttls.insert("fixtures".to_string(), TTL_MS);
    TtlPolicy::new(&ttls, 0.8)
  }

  fn lifecycle(store: &Arc<MemoryStore>, version: &str) -> Lifecycle<MemoryStore> {
    Lifecycle::new(Arc::clone(store), CacheNames::new(version), policy())
  }

  fn entry(endpoint: Option<&str>, age: Option<Duration>) -> StoredResponse {
    StoredResponse {
      status: 200,
      content_type: "application/json".to_string(),
      body: b"[]".to_vec(),
      cached_at: age.map(|a| Utc::now() - a),
      endpoint: endpoint.map(String::from),
    }
  }

  #[test]
  fn test_activate_drops_foreign_partitions() {
    let store = Arc::new(MemoryStore::new());
    store
      .put("sbgw-api-v1", "old", &entry(Some("fixtures"), None))
      .unwrap();
    store
      .put("sbgw-api-v2", "current", &entry(Some("fixtures"), None))
      .unwrap();
    store.put("unrelated", "x", &entry(None, None)).unwrap();

    lifecycle(&store, "v2").activate().unwrap();

    let mut partitions = store.partitions().unwrap();
    partitions.sort();
    assert_eq!(partitions, vec!["sbgw-api-v2".to_string()]);
    // Entries in the surviving partition are untouched.
    assert!(store.get("sbgw-api-v2", "current").unwrap().is_some());
  }

  #[test]
  fn test_activate_preserves_all_current_partitions() {
    let store = Arc::new(MemoryStore::new());
    store
      .put("sbgw-api-v2", "a", &entry(Some("fixtures"), None))
      .unwrap();
    store.put("sbgw-static-v2", "b", &entry(None, None)).unwrap();
    store.put("sbgw-runtime-v2", "c", &entry(None, None)).unwrap();

    lifecycle(&store, "v2").activate().unwrap();

    assert_eq!(store.partitions().unwrap().len(), 3);
  }

  #[test]
  fn test_cleanup_evicts_entries_past_double_ttl() {
    let store = Arc::new(MemoryStore::new());
    let lc = lifecycle(&store, "v2");
    let api = CacheNames::new("v2").api();

    store
      .put(&api, "overaged", &entry(Some("fixtures"), Some(Duration::milliseconds(1_900_000))))
      .unwrap();
    let kept = entry(Some("fixtures"), Some(Duration::milliseconds(1_000_000)));
    store.put(&api, "kept", &kept).unwrap();

    let evicted = lc.cleanup().unwrap();

    assert_eq!(evicted, 1);
    assert!(store.get(&api, "overaged").unwrap().is_none());
    // Untouched, timestamp included.
    assert_eq!(store.get(&api, "kept").unwrap().unwrap(), kept);
  }

  #[test]
  fn test_cleanup_keeps_entry_at_exactly_double_ttl() {
    let store = Arc::new(MemoryStore::new());
    let lc = lifecycle(&store, "v2");
    let api = CacheNames::new("v2").api();

    store
      .put(&api, "boundary", &entry(Some("fixtures"), Some(Duration::milliseconds(1_800_000))))
      .unwrap();

    assert_eq!(lc.cleanup().unwrap(), 0);
    assert!(store.get(&api, "boundary").unwrap().is_some());
  }

  #[test]
  fn test_cleanup_evicts_entries_without_timestamp() {
    let store = Arc::new(MemoryStore::new());
    let lc = lifecycle(&store, "v2");
    let api = CacheNames::new("v2").api();

    store.put(&api, "untimed", &entry(Some("fixtures"), None)).unwrap();

    assert_eq!(lc.cleanup().unwrap(), 1);
    assert!(store.get(&api, "untimed").unwrap().is_none());
  }

  #[test]
  fn test_cleanup_evicts_entries_for_unknown_endpoints() {
    let store = Arc::new(MemoryStore::new());
    let lc = lifecycle(&store, "v2");
    let api = CacheNames::new("v2").api();

    store
      .put(&api, "orphan", &entry(Some("livescores"), Some(Duration::milliseconds(1_000))))
      .unwrap();

    assert_eq!(lc.cleanup().unwrap(), 1);
  }

  #[test]
  fn test_cleanup_ignores_other_partitions() {
    let store = Arc::new(MemoryStore::new());
    let lc = lifecycle(&store, "v2");

    store
      .put(
        &CacheNames::new("v2").static_assets(),
        "asset",
        &entry(None, None),
      )
      .unwrap();

    assert_eq!(lc.cleanup().unwrap(), 0);
    assert!(
      store
        .get(&CacheNames::new("v2").static_assets(), "asset")
        .unwrap()
        .is_some()
    );
  }
}
