//! Credential storage.

use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// A single persisted bearer credential.
///
/// Implementations hold at most one value; `set` replaces it wholesale and
/// the last write wins. The value is returned byte for byte as it was set,
/// except that an empty credential reads back as absent.
pub trait TokenStore: Send + Sync {
  /// Current credential, if any.
  fn get(&self) -> Result<Option<String>>;

  /// Replace the credential.
  fn set(&self, token: &str) -> Result<()>;

  /// Remove the credential. Clearing an empty store is not an error.
  fn clear(&self) -> Result<()>;
}

/// Token kept in a file under a fixed name, surviving restarts.
pub struct FileTokenStore {
  path: PathBuf,
  /// Serializes access from this process
  lock: RwLock<()>,
}

impl FileTokenStore {
  /// File name the credential is stored under.
  pub const KEY: &'static str = "token";

  /// Create a token store in the default data directory.
  pub fn open() -> Result<Self> {
    let dir = crate::config::data_dir()?;
    Ok(Self::in_dir(&dir))
  }

  /// Create a token store inside `dir`.
  pub fn in_dir(dir: &Path) -> Self {
    Self {
      path: dir.join(Self::KEY),
      lock: RwLock::new(()),
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl TokenStore for FileTokenStore {
  fn get(&self) -> Result<Option<String>> {
    let _guard = self.lock.read().map_err(|e| eyre!("Lock poisoned: {}", e))?;

    match std::fs::read_to_string(&self.path) {
      Ok(contents) => Ok((!contents.is_empty()).then_some(contents)),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
      Err(e) => Err(eyre!(
        "Failed to read token file {}: {}",
        self.path.display(),
        e
      )),
    }
  }

  fn set(&self, token: &str) -> Result<()> {
    let _guard = self.lock.write().map_err(|e| eyre!("Lock poisoned: {}", e))?;

    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create token directory: {}", e))?;
    }

    // Write-then-rename so readers never observe a partial token
    let tmp = self.path.with_extension("tmp");
    std::fs::write(&tmp, token)
      .map_err(|e| eyre!("Failed to write token file {}: {}", tmp.display(), e))?;
    std::fs::rename(&tmp, &self.path)
      .map_err(|e| eyre!("Failed to replace token file {}: {}", self.path.display(), e))?;

    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let _guard = self.lock.write().map_err(|e| eyre!("Lock poisoned: {}", e))?;

    match std::fs::remove_file(&self.path) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!(
        "Failed to remove token file {}: {}",
        self.path.display(),
        e
      )),
    }
  }
}

/// In-process token store.
#[derive(Default)]
pub struct MemoryTokenStore {
  token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_token(token: &str) -> Self {
    Self {
      token: RwLock::new(Some(token.to_string())),
    }
  }
}

impl TokenStore for MemoryTokenStore {
  fn get(&self) -> Result<Option<String>> {
    let token = self.token.read().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(token.clone().filter(|t| !t.is_empty()))
  }

  fn set(&self, token: &str) -> Result<()> {
    let mut slot = self.token.write().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *slot = Some(token.to_string());
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let mut slot = self.token.write().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *slot = None;
    Ok(())
  }
}
