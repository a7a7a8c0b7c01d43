//! Core types for the offline cache.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

use crate::http::HttpResponse;

/// Indicates where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Offline mode - network unavailable, serving cached data
  Offline,
}

/// One generation of the offline cache.
///
/// Every build has exactly one current version; stores named after any other
/// version are purged when the gateway activates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheVersion {
  prefix: String,
  version: String,
}

impl CacheVersion {
  pub fn new(prefix: impl Into<String>, version: impl Into<String>) -> Self {
    Self {
      prefix: prefix.into(),
      version: version.into(),
    }
  }

  /// Version baked in at compile time.
  pub fn build_default() -> String {
    concat!("v", env!("CARGO_PKG_VERSION")).to_string()
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  /// Name of the store holding this generation's entries.
  pub fn store_name(&self) -> String {
    format!("{}-{}", self.prefix, self.version)
  }
}

/// Canonical descriptor of a request: method plus absolute URL without fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
  method: String,
  url: String,
}

impl RequestKey {
  pub fn new(method: &Method, url: &Url) -> Self {
    let mut url = url.clone();
    url.set_fragment(None);
    Self {
      method: method.as_str().to_ascii_uppercase(),
      url: url.to_string(),
    }
  }

  pub fn method(&self) -> &str {
    &self.method
  }

  pub fn url(&self) -> &str {
    &self.url
  }

  /// Stable, fixed-length storage key.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_bytes());
    hasher.update(b" ");
    hasher.update(self.url.as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// A captured response stored under a [`RequestKey`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
  pub status: u16,
  /// Header pairs; values that are not valid UTF-8 are dropped on capture
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
  /// When the response was captured
  pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
  /// Capture a response as it is now.
  pub fn capture(response: &HttpResponse) -> Self {
    let headers = response
      .headers
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    Self {
      status: response.status.as_u16(),
      headers,
      body: response.body.clone(),
      cached_at: Utc::now(),
    }
  }

  /// Replay the entry as an offline response.
  pub fn into_response(self) -> HttpResponse {
    let mut headers = HeaderMap::new();
    for (name, value) in &self.headers {
      if let (Ok(name), Ok(value)) = (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
      ) {
        headers.append(name, value);
      }
    }

    HttpResponse {
      status: StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK),
      headers,
      body: self.body,
      source: CacheSource::Offline,
    }
  }
}
