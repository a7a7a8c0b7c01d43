//! Request/response types and the transport seam every component talks through.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use url::Url;

use crate::cache::CacheSource;

/// An outbound HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
  pub method: Method,
  pub url: Url,
  pub headers: HeaderMap,
  pub body: Option<Vec<u8>>,
}

impl HttpRequest {
  pub fn new(method: Method, url: Url) -> Self {
    Self {
      method,
      url,
      headers: HeaderMap::new(),
      body: None,
    }
  }

  pub fn get(url: Url) -> Self {
    Self::new(Method::GET, url)
  }

  /// Attach a JSON body and the matching content type.
  pub fn with_json<T: serde::Serialize>(mut self, body: &T) -> serde_json::Result<Self> {
    self.body = Some(serde_json::to_vec(body)?);
    self.headers.insert(
      reqwest::header::CONTENT_TYPE,
      HeaderValue::from_static("application/json"),
    );
    Ok(self)
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(name).and_then(|v| v.to_str().ok())
  }
}

/// A received HTTP response, live or replayed from the offline cache.
#[derive(Debug, Clone)]
pub struct HttpResponse {
  pub status: StatusCode,
  pub headers: HeaderMap,
  pub body: Vec<u8>,
  /// Where the response came from
  pub source: CacheSource,
}

impl HttpResponse {
  pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: HeaderMap::new(),
      body: body.into(),
      source: CacheSource::Network,
    }
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    if let (Ok(name), Ok(value)) = (
      HeaderName::from_bytes(name.as_bytes()),
      HeaderValue::from_str(value),
    ) {
      self.headers.insert(name, value);
    }
    self
  }

  pub fn is_success(&self) -> bool {
    self.status.is_success()
  }

  pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
    serde_json::from_slice(&self.body)
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

/// Transport-level failure: the request never produced an HTTP response.
///
/// HTTP error statuses are not fetch errors; they arrive as responses.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
  #[error("network error for {url}: {message}")]
  Network { url: String, message: String },

  #[error("request to {url} timed out")]
  Timeout { url: String },

  #[error("invalid URL: {0}")]
  InvalidUrl(String),

  #[error("offline gateway is no longer running")]
  GatewayClosed,
}

impl FetchError {
  pub fn network(url: &Url, message: impl Into<String>) -> Self {
    Self::Network {
      url: url.to_string(),
      message: message.into(),
    }
  }
}

/// Anything that can carry a request to some origin and bring back a response.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError>;
}
