//! Request and response stages of the client pipeline.

use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::auth::Session;
use crate::error::{ApiError, Result};
use crate::http::{HttpRequest, HttpResponse};
use crate::route::{RouteClass, RouteClassifier};

/// Runs before dispatch; may rewrite the request or refuse to send it.
pub trait RequestStage: Send + Sync {
  fn on_request(&self, request: HttpRequest) -> Result<HttpRequest>;
}

/// Runs before the caller sees the outcome; may rewrite it or act on it.
pub trait ResponseStage: Send + Sync {
  fn on_response(&self, outcome: Result<HttpResponse>) -> Result<HttpResponse>;
}

/// Attaches the stored credential as a bearer token.
pub struct BearerAuth {
  session: Session,
  routes: RouteClassifier,
}

impl BearerAuth {
  pub fn new(session: Session, routes: RouteClassifier) -> Self {
    Self { session, routes }
  }
}

impl RequestStage for BearerAuth {
  fn on_request(&self, mut request: HttpRequest) -> Result<HttpRequest> {
    // The proxied service never sees our credential
    if self.routes.classify(&request.url) == RouteClass::ExcludedProxy {
      return Ok(request);
    }

    let token = match self.session.token() {
      Ok(token) => token,
      Err(e) => {
        warn!(error = %e, "failed to read credential, sending without it");
        None
      }
    };

    if let Some(token) = token {
      let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| ApiError::TokenStore(format!("stored token is not a valid header: {}", e)))?;
      request.headers.insert(AUTHORIZATION, value);
    }

    Ok(request)
  }
}

/// Turns error statuses into [`ApiError::Status`].
pub struct RejectErrorStatus;

impl ResponseStage for RejectErrorStatus {
  fn on_response(&self, outcome: Result<HttpResponse>) -> Result<HttpResponse> {
    let response = outcome?;
    if response.is_success() {
      return Ok(response);
    }

    Err(ApiError::Status {
      status: response.status,
      message: error_message(&response),
    })
  }
}

/// Ends the session when the backend answers 401, then re-raises.
pub struct UnauthorizedTeardown {
  session: Session,
}

impl UnauthorizedTeardown {
  pub fn new(session: Session) -> Self {
    Self { session }
  }
}

impl ResponseStage for UnauthorizedTeardown {
  fn on_response(&self, outcome: Result<HttpResponse>) -> Result<HttpResponse> {
    match outcome {
      Err(ApiError::Status { status, message }) if status == StatusCode::UNAUTHORIZED => {
        debug!(%message, "backend rejected credential");
        self.session.teardown();
        Err(ApiError::Unauthorized { message })
      }
      other => other,
    }
  }
}

/// Best human-readable message for an error response.
///
/// The backend reports failures as `{"detail": "..."}`.
fn error_message(response: &HttpResponse) -> String {
  let detail = serde_json::from_slice::<serde_json::Value>(&response.body)
    .ok()
    .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from));

  match detail {
    Some(detail) => detail,
    None => {
      let text = response.text();
      if text.trim().is_empty() {
        response
          .status
          .canonical_reason()
          .unwrap_or("unknown error")
          .to_string()
      } else {
        text
      }
    }
  }
}
