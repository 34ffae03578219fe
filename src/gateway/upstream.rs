use color_eyre::{eyre::eyre, Result};
use std::time::Duration;

use crate::config::Config;
use crate::gateway::types::FetchedResponse;

/// Thin GET client for the upstream origins.
#[derive(Clone)]
pub struct UpstreamClient {
  http: reqwest::Client,
  timeout: Duration,
  api_key: Option<String>,
}

impl UpstreamClient {
  pub fn new(config: &Config) -> Result<Self> {
    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      timeout: config.fetch_timeout(),
      api_key: Config::get_api_key().ok(),
    })
  }

  /// Issue a GET with a bounded wait. When the timeout elapses the
  /// in-flight future is dropped, which aborts the underlying request and
  /// releases the connection.
  pub async fn get(&self, url: &str) -> Result<FetchedResponse> {
    let fetch = async {
      let mut request = self.http.get(url);
      if let Some(key) = &self.api_key {
        request = request.header("X-Api-Key", key);
      }

      let response = request
        .send()
        .await
        .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

      let status = response.status().as_u16();
      let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
      let body = response
        .bytes()
        .await
        .map_err(|e| eyre!("Failed to read body from {}: {}", url, e))?
        .to_vec();

      Ok(FetchedResponse {
        status,
        content_type,
        body,
      })
    };

    tokio::time::timeout(self.timeout, fetch)
      .await
      .map_err(|_| eyre!("Request to {} timed out after {}s", url, self.timeout.as_secs()))?
  }
}
