use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::cache::CacheVersion;
use crate::route::RouteClassifier;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub offline: OfflineConfig,
  #[serde(default)]
  pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  /// Origin serving both the application shell and the API
  pub url: String,
  /// Path prefix of the first-party API
  pub api_prefix: String,
  /// Path prefix of the proxied ledger viewer; never cached or authenticated
  pub proxy_prefix: String,
  /// Per-call timeout
  pub timeout_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      url: "http://localhost:8000".to_string(),
      api_prefix: "/api".to_string(),
      proxy_prefix: "/fava".to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
  /// Store names are "<cache_prefix>-<version>"
  pub cache_prefix: String,
  /// Current cache generation; defaults to the build's version
  pub version: String,
  /// Paths fetched and stored on install
  pub seeds: Vec<String>,
  /// Also store successful live asset responses, not just the seeds
  pub runtime_caching: bool,
}

impl Default for OfflineConfig {
  fn default() -> Self {
    Self {
      cache_prefix: "bcgate".to_string(),
      version: CacheVersion::build_default(),
      seeds: vec!["/".to_string(), "/index.html".to_string()],
      runtime_caching: false,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
  /// Where session teardown sends the application
  pub login_path: String,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      login_path: "/login".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./bcgate.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/bcgate/config.yaml
  ///
  /// Without any file the defaults are used.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("bcgate.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("bcgate").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))?;
    config.origin()?;
    Ok(config)
  }

  /// Origin the application shell and seeds are served from.
  pub fn origin(&self) -> Result<Url> {
    Url::parse(&self.server.url).map_err(|e| eyre!("Invalid server url '{}': {}", self.server.url, e))
  }

  /// Root of the first-party API, e.g. `http://localhost:8000/api/`.
  pub fn api_base(&self) -> Result<Url> {
    let prefix = self.server.api_prefix.trim_matches('/');
    self
      .origin()?
      .join(&format!("{}/", prefix))
      .map_err(|e| eyre!("Invalid api prefix '{}': {}", self.server.api_prefix, e))
  }

  pub fn routes(&self) -> RouteClassifier {
    RouteClassifier::new(&self.server.api_prefix, &self.server.proxy_prefix)
  }

  pub fn cache_version(&self) -> CacheVersion {
    CacheVersion::new(&self.offline.cache_prefix, &self.offline.version)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.server.timeout_secs)
  }

  /// Get the login password from environment variables.
  ///
  /// Checks BCGATE_PASSWORD.
  pub fn get_password() -> Result<String> {
    std::env::var("BCGATE_PASSWORD")
      .map_err(|_| eyre!("Password not found. Set BCGATE_PASSWORD environment variable."))
  }
}

/// Directory holding the cache database, the token and the logs.
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("bcgate"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_file_gives_defaults() {
    let config = Config::parse("{}").unwrap();
    assert_eq!(config.server.url, "http://localhost:8000");
    assert_eq!(config.server.timeout_secs, 30);
    assert_eq!(config.offline.seeds, vec!["/", "/index.html"]);
    assert!(!config.offline.runtime_caching);
    assert_eq!(config.session.login_path, "/login");
    assert_eq!(
      config.cache_version().store_name(),
      format!("bcgate-{}", CacheVersion::build_default())
    );
  }

  #[test]
  fn partial_sections_keep_other_defaults() {
    let config = Config::parse(
      r#"
server:
  url: https://books.example.com
offline:
  cache_prefix: beancount
  version: v2
"#,
    )
    .unwrap();

    assert_eq!(config.server.api_prefix, "/api");
    assert_eq!(config.cache_version().store_name(), "beancount-v2");
    assert_eq!(
      config.api_base().unwrap().as_str(),
      "https://books.example.com/api/"
    );
  }

  #[test]
  fn invalid_server_url_is_rejected() {
    assert!(Config::parse("server:\n  url: not a url\n").is_err());
  }

  #[test]
  fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::load(Some(&dir.path().join("nope.yaml"))).is_err());
  }
}
