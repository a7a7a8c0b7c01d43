//! Request classification shared by the gateway and the API client.

use url::Url;

/// What kind of traffic a URL belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
  /// Third-party service behind the proxy prefix. Never cached, never authenticated.
  ExcludedProxy,
  /// First-party backend. Always live, never served from cache.
  Api,
  /// Application shell and static assets. Network first, cache fallback.
  Asset,
}

/// Classifies URLs by path prefix.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
  api_prefix: String,
  proxy_prefix: String,
}

impl RouteClassifier {
  pub fn new(api_prefix: &str, proxy_prefix: &str) -> Self {
    Self {
      api_prefix: normalize_prefix(api_prefix),
      proxy_prefix: normalize_prefix(proxy_prefix),
    }
  }

  /// Classify a URL. Only the path is considered; query and fragment are ignored.
  pub fn classify(&self, url: &Url) -> RouteClass {
    let path = url.path();
    if has_path_prefix(path, &self.proxy_prefix) {
      RouteClass::ExcludedProxy
    } else if has_path_prefix(path, &self.api_prefix) {
      RouteClass::Api
    } else {
      RouteClass::Asset
    }
  }

  pub fn api_prefix(&self) -> &str {
    &self.api_prefix
  }
}

impl Default for RouteClassifier {
  fn default() -> Self {
    Self::new("/api", "/fava")
  }
}

/// Ensure a leading slash and no trailing slash.
fn normalize_prefix(prefix: &str) -> String {
  let trimmed = prefix.trim().trim_end_matches('/');
  if trimmed.starts_with('/') {
    trimmed.to_string()
  } else {
    format!("/{}", trimmed)
  }
}

/// True when `path` equals `prefix` or continues it with a new segment.
fn has_path_prefix(path: &str, prefix: &str) -> bool {
  if prefix == "/" || prefix.is_empty() {
    return false;
  }
  match path.strip_prefix(prefix) {
    Some(rest) => rest.is_empty() || rest.starts_with('/'),
    None => false,
  }
}
