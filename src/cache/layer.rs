//! Cache layer that orchestrates caching logic with network fetching.

use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::CacheStorage;
use super::traits::{CacheEntry, CacheVersion, RequestKey};
use crate::http::{FetchError, HttpResponse};

/// Cache layer bound to one cache generation.
///
/// This layer sits between the gateway and the network, providing
/// network-first reads with offline fallback.
pub struct CacheLayer<S: CacheStorage> {
  storage: Arc<S>,
  version: CacheVersion,
  /// Whether successful live responses are written back
  runtime_caching: bool,
}

impl<S: CacheStorage> CacheLayer<S> {
  /// Create a new cache layer for the given generation.
  pub fn new(storage: Arc<S>, version: CacheVersion) -> Self {
    Self {
      storage,
      version,
      runtime_caching: false,
    }
  }

  /// Write successful live responses back into the current store.
  pub fn with_runtime_caching(mut self, enabled: bool) -> Self {
    self.runtime_caching = enabled;
    self
  }

  pub fn storage(&self) -> &Arc<S> {
    &self.storage
  }

  pub fn version(&self) -> &CacheVersion {
    &self.version
  }

  /// Name of the store this layer reads and writes.
  pub fn store_name(&self) -> String {
    self.version.store_name()
  }

  /// Fetch with network-first strategy.
  ///
  /// 1. Try the network - on success, return the live response
  /// 2. Optionally replace the cached entry with the live response
  /// 3. On network failure, serve the cached entry (offline mode)
  /// 4. On cache miss, return the original network error
  pub async fn fetch_network_first<F, Fut>(
    &self,
    key: &RequestKey,
    fetcher: F,
  ) -> Result<HttpResponse, FetchError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<HttpResponse, FetchError>>,
  {
    match fetcher().await {
      Ok(response) => {
        if self.runtime_caching && response.is_success() {
          self.store(key, &response);
        }
        Ok(response)
      }
      Err(err) => match self.lookup(key) {
        Some(entry) => {
          warn!(url = key.url(), error = %err, "network unavailable, serving cached response");
          Ok(entry.into_response())
        }
        None => {
          debug!(url = key.url(), "network unavailable and nothing cached");
          Err(err)
        }
      },
    }
  }

  /// Look up a key in the current store. Storage failures count as a miss.
  fn lookup(&self, key: &RequestKey) -> Option<CacheEntry> {
    match self.storage.match_entry(&self.store_name(), key) {
      Ok(entry) => entry,
      Err(e) => {
        warn!(url = key.url(), error = %e, "cache lookup failed");
        None
      }
    }
  }

  /// Replace the entry for a key. Failures are logged, the live response still wins.
  fn store(&self, key: &RequestKey, response: &HttpResponse) {
    let entry = CacheEntry::capture(response);
    if let Err(e) = self.storage.put(&self.store_name(), key, &entry) {
      warn!(url = key.url(), error = %e, "failed to cache live response");
    }
  }
}

impl<S: CacheStorage> Clone for CacheLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      version: self.version.clone(),
      runtime_caching: self.runtime_caching,
    }
  }
}
