//! Background refresh worker.
//!
//! Refreshes are explicit jobs on a queue drained by a spawned task, so a
//! caller that has already been answered from cache never waits on the
//! network. Failures land in the log and nowhere else; the existing entry
//! stays until a later attempt succeeds.

use chrono::Utc;
use color_eyre::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::cache::CacheStore;
use crate::gateway::FetchedResponse;

/// A boxed future that resolves to a fetched response
type BoxFetch = Pin<Box<dyn Future<Output = Result<FetchedResponse>> + Send>>;

/// A deferred fetch, called once by the worker
type FetchFn = Box<dyn FnOnce() -> BoxFetch + Send>;

/// A queued re-fetch of a single cache entry.
pub struct RefreshJob {
  key: String,
  endpoint: String,
  fetch: FetchFn,
}

impl RefreshJob {
  pub fn new<F, Fut>(key: &str, endpoint: &str, fetcher: F) -> Self
  where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<FetchedResponse>> + Send + 'static,
  {
    Self {
      key: key.to_string(),
      endpoint: endpoint.to_string(),
      fetch: Box::new(move || Box::pin(fetcher())),
    }
  }
}

/// Sender half of the refresh queue.
#[derive(Clone)]
pub struct RefreshHandle {
  tx: mpsc::UnboundedSender<RefreshJob>,
}

impl RefreshHandle {
  /// Queue a job. A dropped worker means shutdown; the job is discarded.
  pub fn submit(&self, job: RefreshJob) {
    let _ = self.tx.send(job);
  }
}

/// Spawn the worker task draining refresh jobs into `partition`.
pub fn spawn<S: CacheStore + 'static>(store: Arc<S>, partition: String) -> RefreshHandle {
  let (tx, mut rx) = mpsc::unbounded_channel::<RefreshJob>();

  tokio::spawn(async move {
    while let Some(job) = rx.recv().await {
      run_job(store.as_ref(), &partition, job).await;
    }
  });

  RefreshHandle { tx }
}

async fn run_job<S: CacheStore>(store: &S, partition: &str, job: RefreshJob) {
  match (job.fetch)().await {
    Ok(fetched) if fetched.is_success() => {
      let entry = fetched.to_entry(Utc::now(), Some(job.endpoint.clone()));
      match store.put(partition, &job.key, &entry) {
        Ok(()) => tracing::debug!("Background refresh updated {}", job.endpoint),
        Err(e) => {
          tracing::warn!("Background refresh of {} could not be stored: {}", job.endpoint, e)
        }
      }
    }
    Ok(fetched) => {
      tracing::warn!(
        "Background refresh of {} returned status {}",
        job.endpoint,
        fetched.status
      );
    }
    Err(e) => {
      tracing::warn!("Background refresh of {} failed: {}", job.endpoint, e);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{MemoryStore, StoredResponse};
  use chrono::Duration;
  use color_eyre::eyre::eyre;

  fn stale_entry() -> StoredResponse {
    StoredResponse {
      status: 200,
      content_type: "application/json".to_string(),
      body: b"old".to_vec(),
      cached_at: Some(Utc::now() - Duration::milliseconds(800_000)),
      endpoint: Some("fixtures".to_string()),
    }
  }

  #[tokio::test]
  async fn test_success_overwrites_entry_with_fresh_timestamp() {
    let store = Arc::new(MemoryStore::new());
    store.put("api", "k", &stale_entry()).unwrap();

    let handle = spawn(Arc::clone(&store), "api".to_string());
    handle.submit(RefreshJob::new("k", "fixtures", || async {
      Ok(FetchedResponse {
        status: 200,
        content_type: "application/json".to_string(),
        body: b"new".to_vec(),
      })
    }));

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let entry = store.get("api", "k").unwrap().unwrap();
    assert_eq!(entry.body, b"new");
    assert_eq!(entry.endpoint.as_deref(), Some("fixtures"));
    let age = Utc::now() - entry.cached_at.unwrap();
    assert!(age < Duration::seconds(5));
  }

  #[tokio::test]
  async fn test_failure_leaves_entry_untouched() {
    let store = Arc::new(MemoryStore::new());
    let before = stale_entry();
    store.put("api", "k", &before).unwrap();

    let handle = spawn(Arc::clone(&store), "api".to_string());
    handle.submit(RefreshJob::new("k", "fixtures", || async {
      Err(eyre!("connection reset"))
    }));

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(store.get("api", "k").unwrap().unwrap(), before);
  }

  #[tokio::test]
  async fn test_non_ok_status_leaves_entry_untouched() {
    let store = Arc::new(MemoryStore::new());
    let before = stale_entry();
    store.put("api", "k", &before).unwrap();

    let handle = spawn(Arc::clone(&store), "api".to_string());
    handle.submit(RefreshJob::new("k", "fixtures", || async {
      Ok(FetchedResponse {
        status: 500,
        content_type: "text/plain".to_string(),
        body: b"oops".to_vec(),
      })
    }));

    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert_eq!(store.get("api", "k").unwrap().unwrap(), before);
  }
}
