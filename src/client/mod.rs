//! Authenticated client for the first-party API.
//!
//! Every call runs through an ordered pipeline: request stages before
//! dispatch, then the transport, then response stages before the caller sees
//! the outcome. The default pipeline attaches the bearer credential, rejects
//! error statuses, and tears the session down on 401.

mod api;
pub mod stages;
pub mod types;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use url::Url;

use crate::auth::Session;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::route::RouteClassifier;

use stages::{BearerAuth, RejectErrorStatus, RequestStage, ResponseStage, UnauthorizedTeardown};

/// API client wrapper
#[derive(Clone)]
pub struct ApiClient {
  /// API root, always ending in '/'
  base: Url,
  transport: Arc<dyn Transport>,
  session: Session,
  request_stages: Vec<Arc<dyn RequestStage>>,
  response_stages: Vec<Arc<dyn ResponseStage>>,
}

impl ApiClient {
  /// Create a client with the default pipeline.
  pub fn new(
    base: Url,
    transport: Arc<dyn Transport>,
    session: Session,
    routes: RouteClassifier,
  ) -> Self {
    let base = with_trailing_slash(base);
    Self {
      base,
      transport,
      request_stages: vec![Arc::new(BearerAuth::new(session.clone(), routes))],
      response_stages: vec![
        Arc::new(RejectErrorStatus),
        Arc::new(UnauthorizedTeardown::new(session.clone())),
      ],
      session,
    }
  }

  /// Append a request stage; it runs after the existing ones.
  pub fn with_request_stage(mut self, stage: Arc<dyn RequestStage>) -> Self {
    self.request_stages.push(stage);
    self
  }

  /// Append a response stage; it runs after the existing ones.
  pub fn with_response_stage(mut self, stage: Arc<dyn ResponseStage>) -> Self {
    self.response_stages.push(stage);
    self
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  pub fn base_url(&self) -> &Url {
    &self.base
  }

  pub fn is_authenticated(&self) -> bool {
    self.session.is_authenticated()
  }

  /// Send a request through the full pipeline.
  pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
    let mut request = request;
    for stage in &self.request_stages {
      request = stage.on_request(request)?;
    }

    let mut outcome = self.transport.send(request).await.map_err(ApiError::from);

    for stage in &self.response_stages {
      outcome = stage.on_response(outcome);
    }
    outcome
  }

  /// Resolve an API path against the base URL.
  pub fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path.trim_start_matches('/'))
      .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    let request = HttpRequest::get(self.endpoint(path)?);
    let response = self.execute(request).await?;
    Ok(response.json()?)
  }

  async fn post_json<B, T>(&self, path: &str, body: Option<&B>) -> Result<T>
  where
    B: Serialize,
    T: DeserializeOwned,
  {
    let mut request = HttpRequest::new(Method::POST, self.endpoint(path)?);
    if let Some(body) = body {
      request = request.with_json(body)?;
    }
    let response = self.execute(request).await?;
    Ok(response.json()?)
  }
}

fn with_trailing_slash(mut url: Url) -> Url {
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  url
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::{MemoryTokenStore, Navigator};
  use crate::http::FetchError;
  use async_trait::async_trait;

  struct Nowhere;

  impl Navigator for Nowhere {
    fn navigate(&self, _path: &str) {}
  }

  struct Unreachable;

  #[async_trait]
  impl Transport for Unreachable {
    async fn send(&self, request: HttpRequest) -> std::result::Result<HttpResponse, FetchError> {
      Err(FetchError::network(&request.url, "connection refused"))
    }
  }

  fn client(base: &str) -> ApiClient {
    let session = Session::new(Arc::new(MemoryTokenStore::new()), Arc::new(Nowhere));
    ApiClient::new(
      Url::parse(base).unwrap(),
      Arc::new(Unreachable),
      session,
      RouteClassifier::default(),
    )
  }

  #[test]
  fn endpoints_resolve_under_api_prefix() {
    let client = client("http://localhost:8000/api");
    assert_eq!(
      client.endpoint("/config/accounts").unwrap().as_str(),
      "http://localhost:8000/api/config/accounts"
    );
    assert_eq!(
      client.endpoint("balance").unwrap().as_str(),
      "http://localhost:8000/api/balance"
    );
  }

  #[tokio::test]
  async fn network_failure_surfaces_as_fetch_error() {
    let client = client("http://localhost:8000/api/");
    let err = client.balance().await.unwrap_err();
    assert!(err.is_offline());
  }
}
