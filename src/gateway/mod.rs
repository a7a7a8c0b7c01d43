//! Installable offline gateway.
//!
//! The gateway owns one generation of the offline cache. It seeds the
//! generation's store on install, purges every other generation on activate,
//! and from then on answers every intercepted request network first, falling
//! back to the store only when the network is unreachable.
//!
//! The gateway is meant to run in its own task (see [`spawn`]); callers reach
//! it through a [`GatewayHandle`], which is itself a [`Transport`].

mod lifecycle;
mod worker;

pub use lifecycle::LifecycleState;
pub use worker::{spawn, GatewayHandle};

use reqwest::{Method, StatusCode};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::{CacheEntry, CacheLayer, CacheStorage, CacheVersion, RequestKey};
use crate::http::{FetchError, HttpRequest, HttpResponse, Transport};
use crate::route::{RouteClass, RouteClassifier};

/// Errors that keep a gateway generation from taking control.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
  #[error("failed to fetch seed {url}: {source}")]
  Seed {
    url: String,
    #[source]
    source: FetchError,
  },

  #[error("seed {url} answered {status}")]
  SeedStatus { url: String, status: StatusCode },

  #[error("invalid seed path '{0}'")]
  InvalidSeed(String),

  #[error("failed to write seed entries: {0}")]
  Storage(String),

  #[error("cannot activate from state {0}")]
  NotInstalled(LifecycleState),
}

/// Decision for one intercepted request.
#[derive(Debug)]
pub enum Interception {
  /// The gateway answered the request itself
  Respond(HttpResponse),
  /// Not intercepted; the caller must send the request to the network directly
  Bypass(HttpRequest),
}

/// One generation of the offline gateway.
pub struct OfflineGateway<S: CacheStorage> {
  cache: CacheLayer<S>,
  network: Arc<dyn Transport>,
  routes: RouteClassifier,
  /// Origin the seed paths are resolved against
  origin: Url,
  seeds: Vec<String>,
  state: watch::Sender<LifecycleState>,
}

impl<S: CacheStorage> OfflineGateway<S> {
  pub fn new(
    cache: CacheLayer<S>,
    network: Arc<dyn Transport>,
    routes: RouteClassifier,
    origin: Url,
  ) -> Self {
    let (state, _) = watch::channel(LifecycleState::Parsed);
    Self {
      cache,
      network,
      routes,
      origin,
      seeds: vec!["/".to_string(), "/index.html".to_string()],
      state,
    }
  }

  /// Replace the seed set fetched on install.
  pub fn with_seeds<I, T>(mut self, seeds: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    self.seeds = seeds.into_iter().map(Into::into).collect();
    self
  }

  pub fn state(&self) -> LifecycleState {
    *self.state.borrow()
  }

  /// Watch lifecycle transitions.
  pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
    self.state.subscribe()
  }

  pub fn version(&self) -> &CacheVersion {
    self.cache.version()
  }

  fn set_state(&self, state: LifecycleState) {
    debug!(store = %self.cache.store_name(), %state, "gateway lifecycle");
    self.state.send_replace(state);
  }

  /// Bring this generation into control.
  ///
  /// A generation whose store is already the recorded active one resumes
  /// control without reinstalling, purging any stale generation an earlier
  /// run failed to delete. Otherwise it installs and activates.
  pub async fn register(&self) -> Result<LifecycleState, GatewayError> {
    let current = self.cache.store_name();
    let storage = self.cache.storage();

    let active = storage.active_store().unwrap_or_else(|e| {
      warn!(error = %e, "failed to read active store marker");
      None
    });
    let exists = storage.has(&current).unwrap_or_else(|e| {
      warn!(store = %current, error = %e, "failed to look up current store");
      false
    });

    if active.as_deref() == Some(current.as_str()) && exists {
      info!(store = %current, "offline cache unchanged, resuming control");
      self.purge_stale(&current);
      self.set_state(LifecycleState::Activated);
      return Ok(LifecycleState::Activated);
    }

    self.install().await?;
    self.activate().await?;
    Ok(self.state())
  }

  /// Seed the current store. Every seed must be fetched or nothing is written.
  pub async fn install(&self) -> Result<(), GatewayError> {
    self.set_state(LifecycleState::Installing);
    info!(store = %self.cache.store_name(), seeds = ?self.seeds, "installing offline cache");

    match self.seed().await {
      Ok(count) => {
        info!(store = %self.cache.store_name(), entries = count, "offline cache installed");
        // Waiting is skipped: an installed generation supersedes its predecessor at once
        self.set_state(LifecycleState::Installed);
        Ok(())
      }
      Err(e) => {
        error!(store = %self.cache.store_name(), error = %e, "offline cache install failed");
        self.set_state(LifecycleState::Redundant);
        Err(e)
      }
    }
  }

  async fn seed(&self) -> Result<usize, GatewayError> {
    let urls = self
      .seeds
      .iter()
      .map(|seed| {
        self
          .origin
          .join(seed)
          .map_err(|_| GatewayError::InvalidSeed(seed.clone()))
      })
      .collect::<Result<Vec<Url>, _>>()?;

    let fetches = urls.into_iter().map(|url| {
      let network = Arc::clone(&self.network);
      async move {
        let response = network
          .send(HttpRequest::get(url.clone()))
          .await
          .map_err(|source| GatewayError::Seed {
            url: url.to_string(),
            source,
          })?;

        if !response.is_success() {
          return Err(GatewayError::SeedStatus {
            url: url.to_string(),
            status: response.status,
          });
        }

        Ok((
          RequestKey::new(&Method::GET, &url),
          CacheEntry::capture(&response),
        ))
      }
    });

    let entries = futures::future::try_join_all(fetches).await?;

    self
      .cache
      .storage()
      .add_all(&self.cache.store_name(), &entries)
      .map_err(|e| GatewayError::Storage(e.to_string()))?;

    Ok(entries.len())
  }

  /// Purge every stale generation and take control.
  ///
  /// Purge failures are logged and do not stop activation.
  pub async fn activate(&self) -> Result<(), GatewayError> {
    match self.state() {
      LifecycleState::Installed => {}
      LifecycleState::Activated => return Ok(()),
      other => return Err(GatewayError::NotInstalled(other)),
    }

    self.set_state(LifecycleState::Activating);
    let current = self.cache.store_name();
    self.purge_stale(&current);

    if let Err(e) = self.cache.storage().set_active_store(&current) {
      warn!(store = %current, error = %e, "failed to record active store");
    }

    self.set_state(LifecycleState::Activated);
    info!(store = %current, "offline gateway activated, controlling all clients");
    Ok(())
  }

  /// Delete every store except `current`. Failures are logged and skipped.
  fn purge_stale(&self, current: &str) {
    let storage = self.cache.storage();
    match storage.keys() {
      Ok(names) => {
        for name in names.into_iter().filter(|name| name != current) {
          match storage.delete(&name) {
            Ok(_) => info!(store = %name, "purged stale offline cache"),
            Err(e) => warn!(store = %name, error = %e, "failed to purge stale offline cache"),
          }
        }
      }
      Err(e) => warn!(error = %e, "failed to enumerate offline caches"),
    }
  }

  /// Decide how to answer one outbound request.
  pub async fn intercept(&self, request: HttpRequest) -> Result<Interception, FetchError> {
    if !self.state().is_controlling() {
      return Ok(Interception::Bypass(request));
    }

    match self.routes.classify(&request.url) {
      RouteClass::ExcludedProxy => {
        debug!(url = %request.url, "excluded path, not intercepting");
        Ok(Interception::Bypass(request))
      }
      RouteClass::Api => {
        debug!(url = %request.url, "api request, network only");
        self.network.send(request).await.map(Interception::Respond)
      }
      RouteClass::Asset if request.method == Method::GET => {
        let key = RequestKey::new(&request.method, &request.url);
        let network = Arc::clone(&self.network);
        self
          .cache
          .fetch_network_first(&key, || async move { network.send(request).await })
          .await
          .map(Interception::Respond)
      }
      RouteClass::Asset => self.network.send(request).await.map(Interception::Respond),
    }
  }
}
