//! Transparent caching gateway between the dashboard and its origins.
//!
//! The embedding dashboard hands every outgoing GET to [`Gateway::handle`].
//! API responses are cached under the TTL policy with background refresh,
//! static assets are cache-first, and everything else is left to default
//! handling.

mod api;
mod assets;
mod keys;
mod lifecycle;
mod policy;
mod types;
mod upstream;

pub use api::ApiStrategy;
pub use assets::StaticStrategy;
pub use keys::cache_key;
pub use lifecycle::Lifecycle;
pub use policy::TtlPolicy;
pub use types::{FetchedResponse, RequestDescriptor, ResourceKind, ServeSource, Served};
pub use upstream::UpstreamClient;

use color_eyre::Result;
use std::sync::Arc;

use crate::cache::{CacheNames, CacheStore};
use crate::config::Config;
use crate::refresh;
use crate::router::{Route, Router};

/// Interception facade wiring the router, policy table, and strategies.
pub struct Gateway<S: CacheStore> {
  router: Router,
  upstream: UpstreamClient,
  api: ApiStrategy<S>,
  assets: StaticStrategy<S>,
  lifecycle: Lifecycle<S>,
  asset_origin: String,
  manifest: Vec<String>,
}

impl<S: CacheStore + 'static> Gateway<S> {
  /// Build a gateway over `store`. Spawns the background refresh worker,
  /// so this must run inside a tokio runtime.
  pub fn new(config: &Config, store: S) -> Result<Self> {
    let store = Arc::new(store);
    let names = CacheNames::new(&config.cache.version);
    let policy = TtlPolicy::new(&config.cache.ttl, config.cache.refresh_after);
    let router = Router::new(&config.upstream.origin, &config.upstream.rest_prefix)?;
    let upstream = UpstreamClient::new(config)?;
    let refresh = refresh::spawn(Arc::clone(&store), names.api());

    Ok(Self {
      router,
      upstream,
      api: ApiStrategy::new(Arc::clone(&store), &names, policy.clone(), refresh),
      assets: StaticStrategy::new(Arc::clone(&store), &names),
      lifecycle: Lifecycle::new(store, names, policy),
      asset_origin: config.asset_origin().to_string(),
      manifest: config.assets.manifest.clone(),
    })
  }

  /// Handle one intercepted request. `None` means the request was not
  /// claimed and should proceed with default handling.
  pub async fn handle(&self, req: &RequestDescriptor) -> Result<Option<Served>> {
    match self.router.classify(req) {
      Route::Bypass => Ok(None),
      Route::Api { endpoint } => {
        let upstream = self.upstream.clone();
        let url = req.url.clone();
        let served = self
          .api
          .fetch(req, endpoint.as_deref(), move || {
            let upstream = upstream.clone();
            let url = url.clone();
            async move { upstream.get(&url).await }
          })
          .await?;
        Ok(Some(served))
      }
      Route::StaticAsset => {
        let upstream = self.upstream.clone();
        let url = req.url.clone();
        let served = self
          .assets
          .fetch(req, move || async move { upstream.get(&url).await })
          .await?;
        Ok(Some(served))
      }
    }
  }

  /// Pre-warm the static partition from the configured manifest.
  pub async fn install(&self) -> Result<()> {
    self
      .lifecycle
      .install(&self.upstream, &self.asset_origin, &self.manifest)
      .await
  }

  /// Drop cache partitions left behind by prior versions.
  pub fn activate(&self) -> Result<()> {
    self.lifecycle.activate()
  }

  /// Run one cleanup pass over the API partition.
  pub fn cleanup(&self) -> Result<usize> {
    self.lifecycle.cleanup()
  }

  pub fn lifecycle(&self) -> &Lifecycle<S> {
    &self.lifecycle
  }
}
