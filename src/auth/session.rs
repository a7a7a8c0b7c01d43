//! Session state derived from the token store, and session teardown.

use color_eyre::Result;
use std::sync::Arc;
use tracing::{info, warn};

use super::token::TokenStore;

/// Moves the whole application context to another location.
///
/// A navigation is a full reload: in-memory state tied to the old location
/// is discarded.
pub trait Navigator: Send + Sync {
  fn navigate(&self, path: &str);
}

/// The authenticated session of the application context.
#[derive(Clone)]
pub struct Session {
  tokens: Arc<dyn TokenStore>,
  navigator: Arc<dyn Navigator>,
  login_path: String,
}

impl Session {
  pub fn new(tokens: Arc<dyn TokenStore>, navigator: Arc<dyn Navigator>) -> Self {
    Self {
      tokens,
      navigator,
      login_path: "/login".to_string(),
    }
  }

  /// Set the login boundary teardown navigates to.
  pub fn with_login_path(mut self, path: &str) -> Self {
    self.login_path = path.to_string();
    self
  }

  pub fn login_path(&self) -> &str {
    &self.login_path
  }

  /// Whether a credential is currently stored.
  ///
  /// Reads the store on every call. A store that cannot be read counts as
  /// signed out.
  pub fn is_authenticated(&self) -> bool {
    match self.tokens.get() {
      Ok(token) => token.is_some(),
      Err(e) => {
        warn!(error = %e, "failed to read credential");
        false
      }
    }
  }

  /// Current credential, if any.
  pub fn token(&self) -> Result<Option<String>> {
    self.tokens.get()
  }

  /// Store a freshly issued credential.
  pub fn establish(&self, token: &str) -> Result<()> {
    self.tokens.set(token)?;
    info!("session established");
    Ok(())
  }

  /// Drop the credential and send the application to the login boundary.
  ///
  /// Navigation happens even if the credential could not be removed.
  pub fn teardown(&self) {
    if let Err(e) = self.tokens.clear() {
      warn!(error = %e, "failed to clear credential during teardown");
    }
    warn!(to = %self.login_path, "session ended, redirecting to login");
    self.navigator.navigate(&self.login_path);
  }
}
