//! Live network transport backed by reqwest.

use async_trait::async_trait;
use std::time::Duration;

use crate::http::{FetchError, HttpRequest, HttpResponse, Transport};

/// Sends requests straight to the network.
#[derive(Clone)]
pub struct NetworkTransport {
  client: reqwest::Client,
}

impl NetworkTransport {
  /// Create a transport whose calls give up after `timeout`.
  pub fn new(timeout: Duration) -> color_eyre::Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| color_eyre::eyre::eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self::from_client(client))
  }

  /// Wrap an already configured client.
  pub fn from_client(client: reqwest::Client) -> Self {
    Self { client }
  }
}

#[async_trait]
impl Transport for NetworkTransport {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
    let url = request.url.clone();

    let mut builder = self
      .client
      .request(request.method, request.url)
      .headers(request.headers);
    if let Some(body) = request.body {
      builder = builder.body(body);
    }

    let response = builder.send().await.map_err(|e| {
      if e.is_timeout() {
        FetchError::Timeout {
          url: url.to_string(),
        }
      } else if e.is_builder() {
        FetchError::InvalidUrl(format!("{}: {}", url, e))
      } else {
        FetchError::network(&url, e.to_string())
      }
    })?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = response
      .bytes()
      .await
      .map_err(|e| FetchError::network(&url, format!("Failed to read body: {}", e)))?;

    let mut out = HttpResponse::new(status, body.to_vec());
    out.headers = headers;
    Ok(out)
  }
}
