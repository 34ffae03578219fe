//! Control channel and daemon loop.

use color_eyre::Result;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cache::CacheStore;
use crate::gateway::Lifecycle;

/// External control signals accepted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
  /// Run the cleanup pass over the API partition.
  CleanupCache,
}

/// Cloneable sender half of the control channel.
#[derive(Clone)]
pub struct ControlHandle {
  tx: mpsc::UnboundedSender<ControlSignal>,
}

impl ControlHandle {
  /// Deliver a control signal. Dropped silently once the loop has shut
  /// down.
  pub fn send(&self, signal: ControlSignal) {
    let _ = self.tx.send(signal);
  }
}

/// Daemon loop: periodic cleanup tick plus external control signals.
pub struct ControlLoop<S: CacheStore> {
  lifecycle: Lifecycle<S>,
  handle: ControlHandle,
  rx: mpsc::UnboundedReceiver<ControlSignal>,
  cleanup_interval: Duration,
}

impl<S: CacheStore> ControlLoop<S> {
  pub fn new(lifecycle: Lifecycle<S>, cleanup_interval: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    Self {
      lifecycle,
      handle: ControlHandle { tx },
      rx,
      cleanup_interval,
    }
  }

  /// Handle for delivering signals from outside the loop.
  pub fn handle(&self) -> ControlHandle {
    self.handle.clone()
  }

  /// Run until ctrl-c.
  pub async fn run(mut self) -> Result<()> {
    let start = tokio::time::Instant::now() + self.cleanup_interval;
    let mut tick = tokio::time::interval_at(start, self.cleanup_interval);

    loop {
      tokio::select! {
        _ = tick.tick() => self.run_cleanup(),
        Some(signal) = self.rx.recv() => match signal {
          ControlSignal::CleanupCache => self.run_cleanup(),
        },
        _ = tokio::signal::ctrl_c() => {
          tracing::info!("Shutting down");
          break;
        }
      }
    }

    Ok(())
  }

  fn run_cleanup(&self) {
    match self.lifecycle.cleanup() {
      Ok(evicted) => tracing::info!("Cleanup pass evicted {} expired entries", evicted),
      Err(e) => tracing::warn!("Cleanup pass failed: {}", e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::{CacheNames, MemoryStore, StoredResponse};
  use crate::gateway::TtlPolicy;
  use chrono::Utc;
  use std::collections::HashMap;
  use std::sync::Arc;

  #[tokio::test]
  async fn test_cleanup_signal_runs_pass() {
    let store = Arc::new(MemoryStore::new());
    let names = CacheNames::new("test");
    let mut ttls = HashMap::new();
    ttls.insert("fixtures".to_string(), 900_000u64);
    let lifecycle = Lifecycle::new(
      Arc::clone(&store),
      names.clone(),
      TtlPolicy::new(&ttls, 0.8),
    );

    store
      .put(
        &names.api(),
        "overaged",
        &StoredResponse {
          status: 200,
          content_type: "application/json".to_string(),
          body: b"[]".to_vec(),
          cached_at: Some(Utc::now() - chrono::Duration::milliseconds(2_000_000)),
          endpoint: Some("fixtures".to_string()),
        },
      )
      .unwrap();

    let control = ControlLoop::new(lifecycle, Duration::from_secs(3600));
    let handle = control.handle();
    let task = tokio::spawn(control.run());

    handle.send(ControlSignal::CleanupCache);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(store.get(&names.api(), "overaged").unwrap().is_none());
    task.abort();
  }
}
