use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use super::{Interception, LifecycleState, OfflineGateway};
use crate::cache::CacheStorage;
use crate::http::{FetchError, HttpRequest, HttpResponse, Transport};

/// Messages the application context sends to the worker
#[derive(Debug)]
enum GatewayMessage {
  Fetch {
    request: HttpRequest,
    reply: oneshot::Sender<Result<Interception, FetchError>>,
  },
}

/// Application-side end of a running gateway worker.
///
/// Requests are handed to the worker over a channel; requests the worker
/// declines to intercept are sent straight to the network by the handle.
#[derive(Clone)]
pub struct GatewayHandle {
  tx: mpsc::UnboundedSender<GatewayMessage>,
  direct: Arc<dyn Transport>,
  state: watch::Receiver<LifecycleState>,
}

/// Run a gateway in its own task.
///
/// The worker registers the gateway first and then serves intercepted
/// requests, each in its own task. Requests sent before registration
/// settles are queued.
pub fn spawn<S>(gateway: OfflineGateway<S>, direct: Arc<dyn Transport>) -> GatewayHandle
where
  S: CacheStorage + 'static,
{
  let (tx, mut rx) = mpsc::unbounded_channel();
  let state = gateway.subscribe();
  let gateway = Arc::new(gateway);

  tokio::spawn(async move {
    if let Err(e) = gateway.register().await {
      warn!(error = %e, "offline gateway did not take control");
    }

    while let Some(msg) = rx.recv().await {
      match msg {
        GatewayMessage::Fetch { request, reply } => {
          let gateway = Arc::clone(&gateway);
          tokio::spawn(async move {
            // Receiver gone means the caller stopped waiting
            let _ = reply.send(gateway.intercept(request).await);
          });
        }
      }
    }

    debug!("offline gateway worker stopped");
  });

  GatewayHandle { tx, direct, state }
}

impl GatewayHandle {
  /// Current lifecycle state of the worker's gateway.
  pub fn state(&self) -> LifecycleState {
    *self.state.borrow()
  }

  /// Wait until registration has either activated the gateway or failed.
  pub async fn ready(&self) -> LifecycleState {
    let mut rx = self.state.clone();
    let settled = rx.wait_for(|state| state.is_settled()).await.map(|s| *s);
    match settled {
      Ok(state) => state,
      Err(_) => *rx.borrow(),
    }
  }
}

#[async_trait]
impl Transport for GatewayHandle {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
    let (reply, rx) = oneshot::channel();
    self
      .tx
      .send(GatewayMessage::Fetch { request, reply })
      .map_err(|_| FetchError::GatewayClosed)?;

    match rx.await.map_err(|_| FetchError::GatewayClosed)?? {
      Interception::Respond(response) => Ok(response),
      Interception::Bypass(request) => self.direct.send(request).await,
    }
  }
}
