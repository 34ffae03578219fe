//! Request and response types shared across the gateway.

use chrono::{DateTime, Utc};

use crate::cache::StoredResponse;

/// Declared resource type of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
  Script,
  Style,
  Document,
  Image,
  Font,
  Media,
  Other,
}

/// Descriptor of an outgoing request, as seen at the interception point.
///
/// Cache identity is method + URL only; request headers never participate,
/// so upstream callers may attach `Range`/`Range-Unit` pairs freely.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
  pub method: String,
  pub url: String,
  pub kind: ResourceKind,
}

impl RequestDescriptor {
  pub fn get(url: impl Into<String>, kind: ResourceKind) -> Self {
    Self {
      method: "GET".to_string(),
      url: url.into(),
      kind,
    }
  }
}

/// Response fetched from an upstream origin.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
  pub status: u16,
  pub content_type: String,
  pub body: Vec<u8>,
}

impl FetchedResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Convert into a cache entry stamped at `cached_at`.
  pub fn to_entry(&self, cached_at: DateTime<Utc>, endpoint: Option<String>) -> StoredResponse {
    StoredResponse {
      status: self.status,
      content_type: self.content_type.clone(),
      body: self.body.clone(),
      cached_at: Some(cached_at),
      endpoint,
    }
  }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
  /// Fresh cache hit
  Cache,
  /// Fetched from the network just now
  Fresh,
  /// Expired entry served because the network attempt failed
  StaleFallback,
  /// No cache available and the network attempt failed
  Failure,
}

/// Response handed back to the embedding caller.
#[derive(Debug, Clone)]
pub struct Served {
  pub status: u16,
  pub content_type: String,
  pub body: Vec<u8>,
  pub source: ServeSource,
}

impl Served {
  pub fn from_entry(entry: &StoredResponse, source: ServeSource) -> Self {
    Self {
      status: entry.status,
      content_type: entry.content_type.clone(),
      body: entry.body.clone(),
      source,
    }
  }

  pub fn from_fetched(fetched: &FetchedResponse, source: ServeSource) -> Self {
    Self {
      status: fetched.status,
      content_type: fetched.content_type.clone(),
      body: fetched.body.clone(),
      source,
    }
  }

  /// Synthesized API failure response for when no fallback exists.
  pub fn network_failure() -> Self {
    let body = serde_json::json!({ "error": "Network request failed" });
    Self {
      status: 503,
      content_type: "application/json".to_string(),
      body: serde_json::to_vec(&body).unwrap_or_default(),
      source: ServeSource::Failure,
    }
  }

  /// Placeholder returned when a static asset cannot be fetched.
  pub fn offline_placeholder() -> Self {
    Self {
      status: 503,
      content_type: "text/plain".to_string(),
      body: b"Offline".to_vec(),
      source: ServeSource::Failure,
    }
  }
}
