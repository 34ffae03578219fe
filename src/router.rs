//! Request classification for the interception point.

use color_eyre::{eyre::eyre, Result};
use url::Url;

use crate::gateway::{RequestDescriptor, ResourceKind};

/// Routing decision for an intercepted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
  /// Request targets the API origin. `endpoint` is `None` for paths
  /// outside the REST prefix; that traffic goes to the network uncached.
  Api { endpoint: Option<String> },
  /// Script, style, or document asset.
  StaticAsset,
  /// Not claimed; left to default handling.
  Bypass,
}

/// Classifies outgoing requests by origin and declared resource kind.
#[derive(Debug, Clone)]
pub struct Router {
  api_origin: url::Origin,
  rest_prefix: String,
}

impl Router {
  pub fn new(api_origin: &str, rest_prefix: &str) -> Result<Self> {
    let origin = Url::parse(api_origin)
      .map_err(|e| eyre!("Invalid API origin {}: {}", api_origin, e))?
      .origin();

    Ok(Self {
      api_origin: origin,
      rest_prefix: rest_prefix.trim_end_matches('/').to_string(),
    })
  }

  /// Classify a request. Pure: the decision depends only on the descriptor
  /// and the configured origin and prefix.
  pub fn classify(&self, req: &RequestDescriptor) -> Route {
    if !req.method.eq_ignore_ascii_case("GET") {
      return Route::Bypass;
    }

    let Ok(url) = Url::parse(&req.url) else {
      return Route::Bypass;
    };

    if url.origin() == self.api_origin {
      return Route::Api {
        endpoint: self.extract_endpoint(&url),
      };
    }

    match req.kind {
      ResourceKind::Script | ResourceKind::Style | ResourceKind::Document => Route::StaticAsset,
      _ => Route::Bypass,
    }
  }

  /// Logical endpoint name: the path segment immediately after the REST
  /// prefix, query string excluded.
  fn extract_endpoint(&self, url: &Url) -> Option<String> {
    let rest = url.path().strip_prefix(&self.rest_prefix)?;
    let rest = rest.strip_prefix('/')?;
    let segment = rest.split('/').next()?;

    if segment.is_empty() {
      None
    } else {
      Some(segment.to_string())
    }
  }
}
