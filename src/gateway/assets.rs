//! Cache-first strategy for static assets.

use chrono::Utc;
use color_eyre::Result;
use std::future::Future;
use std::sync::Arc;

use crate::cache::{CacheNames, CacheStore};

use super::keys::cache_key;
use super::types::{FetchedResponse, RequestDescriptor, ServeSource, Served};

/// Cache-first strategy for scripts, styles, and documents.
///
/// Assets are versioned by build, not by time, so a hit is served with no
/// freshness check and no network contact.
pub struct StaticStrategy<S: CacheStore> {
  store: Arc<S>,
  partition: String,
}

impl<S: CacheStore> StaticStrategy<S> {
  pub fn new(store: Arc<S>, names: &CacheNames) -> Self {
    Self {
      store,
      partition: names.static_assets(),
    }
  }

  /// Serve one asset request through the cache.
  pub async fn fetch<F, Fut>(&self, req: &RequestDescriptor, fetcher: F) -> Result<Served>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<FetchedResponse>>,
  {
    let key = cache_key(&req.method, &req.url);

    if let Some(entry) = self.store.get(&self.partition, &key)? {
      return Ok(Served::from_entry(&entry, ServeSource::Cache));
    }

    match fetcher().await {
      Ok(fetched) if fetched.is_success() => {
        let entry = fetched.to_entry(Utc::now(), None);
        self.store.put(&self.partition, &key, &entry)?;
        Ok(Served::from_entry(&entry, ServeSource::Fresh))
      }
      result => {
        match &result {
          Ok(fetched) => {
            tracing::warn!("Asset fetch for {} returned status {}", req.url, fetched.status)
          }
          Err(e) => tracing::warn!("Asset fetch for {} failed: {}", req.url, e),
        }
        Ok(Served::offline_placeholder())
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{MemoryStore, StoredResponse};
  use crate::gateway::types::ResourceKind;
  use color_eyre::eyre::eyre;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn names() -> CacheNames {
    CacheNames::new("test")
  }

  fn strategy(store: &Arc<MemoryStore>) -> StaticStrategy<MemoryStore> {
    StaticStrategy::new(Arc::clone(store), &names())
  }

  fn request(url: &str) -> RequestDescriptor {
    RequestDescriptor::get(url, ResourceKind::Script)
  }

  #[tokio::test]
  async fn test_hit_served_without_network() {
    let store = Arc::new(MemoryStore::new());
    let req = request("https://dashboard.example/js/app.js");
    let key = cache_key(&req.method, &req.url);
    let entry = StoredResponse {
      status: 200,
      content_type: "text/javascript".to_string(),
      body: b"console.log(1)".to_vec(),
      cached_at: None,
      endpoint: None,
    };
    store.put(&names().static_assets(), &key, &entry).unwrap();

    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = Arc::clone(&calls);
    let served = strategy(&store)
      .fetch(&req, move || async move {
        calls_in.fetch_add(1, Ordering::SeqCst);
        Err(eyre!("should not be called"))
      })
      .await
      .unwrap();

    assert_eq!(served.source, ServeSource::Cache);
    assert_eq!(served.body, b"console.log(1)");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_miss_fetches_stores_and_serves() {
    let store = Arc::new(MemoryStore::new());
    let req = request("https://dashboard.example/js/app.js");

    let served = strategy(&store)
      .fetch(&req, || async {
        Ok(FetchedResponse {
          status: 200,
          content_type: "text/javascript".to_string(),
          body: b"console.log(1)".to_vec(),
        })
      })
      .await
      .unwrap();

    assert_eq!(served.source, ServeSource::Fresh);

    // Next lookup is a hit with no network contact.
    let served = strategy(&store)
      .fetch(&req, || async { Err(eyre!("offline")) })
      .await
      .unwrap();
    assert_eq!(served.source, ServeSource::Cache);
    assert_eq!(served.body, b"console.log(1)");
  }

  #[tokio::test]
  async fn test_failure_returns_offline_placeholder() {
    let store = Arc::new(MemoryStore::new());
    let req = request("https://dashboard.example/js/app.js");

    let served = strategy(&store)
      .fetch(&req, || async { Err(eyre!("offline")) })
      .await
      .unwrap();

    assert_eq!(served.status, 503);
    assert_eq!(served.body, b"Offline");
    assert!(store.keys(&names().static_assets()).unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_non_ok_response_not_stored() {
    let store = Arc::new(MemoryStore::new());
    let req = request("https://dashboard.example/js/missing.js");

    let served = strategy(&store)
      .fetch(&req, || async {
        Ok(FetchedResponse {
          status: 404,
          content_type: "text/plain".to_string(),
          body: b"not found".to_vec(),
        })
      })
      .await
      .unwrap();

    assert_eq!(served.source, ServeSource::Failure);
    assert!(store.keys(&names().static_assets()).unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_asset_failure_does_not_touch_api_partition() {
    let store = Arc::new(MemoryStore::new());
    let req = request("https://dashboard.example/js/app.js");
    store
      .put(
        &names().api(),
        "some-api-key",
        &StoredResponse {
          status: 200,
          content_type: "application/json".to_string(),
          body: b"[]".to_vec(),
          cached_at: None,
          endpoint: Some("fixtures".to_string()),
        },
      )
      .unwrap();

    let _ = strategy(&store)
      .fetch(&req, || async { Err(eyre!("offline")) })
      .await
      .unwrap();

    assert_eq!(store.keys(&names().api()).unwrap().len(), 1);
  }
}
