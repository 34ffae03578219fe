//! Cache key derivation.

use sha2::{Digest, Sha256};

/// Stable cache key for a request: method + full URL, hashed for a fixed
/// length. Headers are deliberately excluded from the identity.
pub fn cache_key(method: &str, url: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(method.to_uppercase().as_bytes());
  hasher.update(b" ");
  hasher.update(url.as_bytes());
  hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_same_request_same_key() {
    let a = cache_key("GET", "https://api.example/rest/v1/fixtures");
    let b = cache_key("GET", "https://api.example/rest/v1/fixtures");
    assert_eq!(a, b);
  }

  #[test]
  fn test_method_is_case_insensitive() {
    let a = cache_key("get", "https://api.example/rest/v1/fixtures");
    let b = cache_key("GET", "https://api.example/rest/v1/fixtures");
    assert_eq!(a, b);
  }

  #[test]
  fn test_query_participates_in_identity() {
    let a = cache_key("GET", "https://api.example/rest/v1/odds?league=epl");
    let b = cache_key("GET", "https://api.example/rest/v1/odds?league=nba");
    assert_ne!(a, b);
  }

  #[test]
  fn test_method_participates_in_identity() {
    let a = cache_key("GET", "https://api.example/rest/v1/odds");
    let b = cache_key("HEAD", "https://api.example/rest/v1/odds");
    assert_ne!(a, b);
  }
}
