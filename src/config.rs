use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub upstream: UpstreamConfig,
  pub cache: CacheConfig,
  #[serde(default)]
  pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
  /// Origin of the REST data source, e.g. "https://api.oddsfeed.example"
  pub origin: String,
  /// Path prefix the logical endpoint name follows
  #[serde(default = "default_rest_prefix")]
  pub rest_prefix: String,
  /// Bounded wait for upstream fetches. Generous by default so large
  /// paginated payloads can finish.
  #[serde(default = "default_fetch_timeout_secs")]
  pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Version tag namespacing all partitions; bump it to invalidate
  /// everything on the next activation
  pub version: String,
  /// Override for the cache database location
  pub db_path: Option<PathBuf>,
  /// Fraction of an endpoint's TTL after which a fresh hit also queues a
  /// background refresh (1.0 disables early refresh)
  #[serde(default = "default_refresh_after")]
  pub refresh_after: f64,
  /// Seconds between periodic cleanup passes in daemon mode
  #[serde(default = "default_cleanup_interval_secs")]
  pub cleanup_interval_secs: u64,
  /// TTL in milliseconds per cacheable endpoint; endpoints absent from
  /// this map are never cached
  #[serde(default)]
  pub ttl: HashMap<String, u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssetsConfig {
  /// Origin the manifest paths are fetched from (defaults to the
  /// upstream origin)
  pub origin: Option<String>,
  /// Static asset paths to pre-warm on install
  #[serde(default)]
  pub manifest: Vec<String>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sbgw.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sbgw/config.yaml
  /// 4. ~/.config/sbgw/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/sbgw/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("sbgw.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sbgw").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the upstream API key from environment variables.
  ///
  /// Checks SBGW_API_KEY; the key is optional and the gateway sends
  /// requests without one when it is unset.
  pub fn get_api_key() -> Result<String> {
    std::env::var("SBGW_API_KEY")
      .map_err(|_| eyre!("Upstream API key not found. Set SBGW_API_KEY environment variable."))
  }

  /// Origin static assets are fetched from.
  pub fn asset_origin(&self) -> &str {
    self.assets.origin.as_deref().unwrap_or(&self.upstream.origin)
  }

  pub fn fetch_timeout(&self) -> Duration {
    Duration::from_secs(self.upstream.fetch_timeout_secs)
  }

  pub fn cleanup_interval(&self) -> Duration {
    Duration::from_secs(self.cache.cleanup_interval_secs)
  }
}

fn default_rest_prefix() -> String {
  "/rest/v1".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
  300
}

fn default_refresh_after() -> f64 {
  0.8
}

fn default_cleanup_interval_secs() -> u64 {
  300
}
