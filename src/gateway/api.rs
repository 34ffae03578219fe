//! Cache-first strategy for API traffic.

use chrono::Utc;
use color_eyre::Result;
use std::future::Future;
use std::sync::Arc;

use crate::cache::{CacheNames, CacheStore};
use crate::refresh::{RefreshHandle, RefreshJob};

use super::keys::cache_key;
use super::policy::TtlPolicy;
use super::types::{FetchedResponse, RequestDescriptor, ServeSource, Served};

/// Cache-first-with-background-refresh strategy for classified API traffic.
///
/// Terminal outcomes map onto [`ServeSource`]: a fresh hit is served from
/// cache, a miss or stale hit gets one network attempt, a failed attempt
/// falls back to whatever was cached, and with nothing cached at all a
/// machine-readable 503 is synthesized. Network errors never escape to the
/// caller.
pub struct ApiStrategy<S: CacheStore> {
  store: Arc<S>,
  partition: String,
  policy: TtlPolicy,
  refresh: RefreshHandle,
}

impl<S: CacheStore> ApiStrategy<S> {
  pub fn new(
    store: Arc<S>,
    names: &CacheNames,
    policy: TtlPolicy,
    refresh: RefreshHandle,
  ) -> Self {
    Self {
      store,
      partition: names.api(),
      policy,
      refresh,
    }
  }

  /// Serve one API request through the cache.
  ///
  /// The fetcher is invoked at most once on the caller's chain; a fresh
  /// hit that has aged past the refresh threshold hands it to the
  /// background worker instead.
  pub async fn fetch<F, Fut>(
    &self,
    req: &RequestDescriptor,
    endpoint: Option<&str>,
    fetcher: F,
  ) -> Result<Served>
  where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<FetchedResponse>> + Send + 'static,
  {
    // Traffic without a policy entry is never stored.
    let Some(endpoint) = endpoint else {
      return passthrough(&req.url, fetcher).await;
    };
    if self.policy.ttl(endpoint).is_none() {
      return passthrough(&req.url, fetcher).await;
    }

    let key = cache_key(&req.method, &req.url);
    let cached = self.store.get(&self.partition, &key)?;
    let now = Utc::now();

    if let Some(entry) = &cached {
      if self.policy.is_fresh(endpoint, entry.cached_at, now) {
        if self.policy.refresh_due(endpoint, entry.cached_at, now) {
          self.refresh.submit(RefreshJob::new(&key, endpoint, fetcher));
        }
        return Ok(Served::from_entry(entry, ServeSource::Cache));
      }
    }

    // Miss or stale: one network attempt, then fall back to what we have.
    match fetcher().await {
      Ok(fetched) if fetched.is_success() => {
        let entry = fetched.to_entry(Utc::now(), Some(endpoint.to_string()));
        self.store.put(&self.partition, &key, &entry)?;
        Ok(Served::from_entry(&entry, ServeSource::Fresh))
      }
      result => {
        match &result {
          Ok(fetched) => {
            tracing::warn!("Upstream returned status {} for {}", fetched.status, req.url)
          }
          Err(e) => tracing::warn!("Upstream fetch for {} failed: {}", req.url, e),
        }

        match cached {
          Some(entry) => Ok(Served::from_entry(&entry, ServeSource::StaleFallback)),
          None => Ok(Served::network_failure()),
        }
      }
    }
  }
}

/// Issue the request directly to the network; the response is returned
/// unmodified and never stored.
async fn passthrough<F, Fut>(url: &str, fetcher: F) -> Result<Served>
where
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<FetchedResponse>>,
{
  match fetcher().await {
    Ok(fetched) => Ok(Served::from_fetched(&fetched, ServeSource::Fresh)),
    Err(e) => {
      tracing::warn!("Uncached fetch for {} failed: {}", url, e);
      Ok(Served::network_failure())
    }
  }
}
