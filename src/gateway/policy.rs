//! TTL policy for cacheable endpoints.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Freshness policy table mapping endpoint names to TTLs.
///
/// The table is injected configuration: endpoints absent from it are never
/// cached. An entry with no timestamp is infinitely stale for every check.
#[derive(Debug, Clone)]
pub struct TtlPolicy {
  ttls: HashMap<String, Duration>,
  /// Fraction of the TTL after which a fresh hit also queues a background
  /// refresh. 1.0 disables early refresh.
  refresh_after: f64,
}

impl TtlPolicy {
  pub fn new(ttls_ms: &HashMap<String, u64>, refresh_after: f64) -> Self {
    let ttls = ttls_ms
      .iter()
      .map(|(name, ms)| (name.clone(), Duration::milliseconds(*ms as i64)))
      .collect();

    Self {
      ttls,
      refresh_after: refresh_after.clamp(0.0, 1.0),
    }
  }

  /// TTL for an endpoint, if it is cacheable at all.
  pub fn ttl(&self, endpoint: &str) -> Option<Duration> {
    self.ttls.get(endpoint).copied()
  }

  /// Whether a cached entry may be served without a network attempt.
  pub fn is_fresh(
    &self,
    endpoint: &str,
    cached_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
  ) -> bool {
    match (self.ttl(endpoint), cached_at) {
      (Some(ttl), Some(cached_at)) => now - cached_at < ttl,
      _ => false,
    }
  }

  /// Whether a fresh hit has aged past the refresh threshold.
  pub fn refresh_due(
    &self,
    endpoint: &str,
    cached_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
  ) -> bool {
    match (self.ttl(endpoint), cached_at) {
      (Some(ttl), Some(cached_at)) => {
        let age = (now - cached_at).num_milliseconds() as f64;
        age > ttl.num_milliseconds() as f64 * self.refresh_after
      }
      _ => false,
    }
  }

  /// Cleanup eviction check: age beyond twice the TTL, or nothing to go on.
  pub fn evictable(
    &self,
    endpoint: Option<&str>,
    cached_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
  ) -> bool {
    let Some(ttl) = endpoint.and_then(|e| self.ttl(e)) else {
      return true;
    };
    let Some(cached_at) = cached_at else {
      return true;
    };

    now - cached_at > ttl * 2
  }
}
