//! Errors surfaced by the authenticated API client

use reqwest::StatusCode;

use crate::http::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// No response arrived (network down, timeout, gateway gone)
  #[error(transparent)]
  Fetch(#[from] FetchError),

  /// The backend answered with an error status
  #[error("API error ({status}): {message}")]
  Status { status: StatusCode, message: String },

  /// The backend rejected the credential; the session has been torn down
  #[error("unauthorized: {message}")]
  Unauthorized { message: String },

  #[error("JSON error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("token store error: {0}")]
  TokenStore(String),

  #[error("invalid URL: {0}")]
  InvalidUrl(String),
}

impl ApiError {
  /// HTTP status carried by the error, if the backend answered at all.
  pub fn status(&self) -> Option<StatusCode> {
    match self {
      ApiError::Status { status, .. } => Some(*status),
      ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
      _ => None,
    }
  }

  /// Whether the request failed because no response could be obtained.
  pub fn is_offline(&self) -> bool {
    matches!(self, ApiError::Fetch(_))
  }
}

pub type Result<T> = std::result::Result<T, ApiError>;
