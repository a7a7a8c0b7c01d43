//! Test doubles shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use bcgate::cache::{CacheEntry, CacheStorage, RequestKey, SqliteStorage};
use bcgate::gateway::Interception;
use bcgate::{FetchError, HttpRequest, HttpResponse, Navigator, Transport};
use reqwest::StatusCode;

/// Network double answering from a fixed table of paths.
pub struct ScriptedNetwork {
  routes: Mutex<HashMap<String, (StatusCode, Vec<u8>)>>,
  online: AtomicBool,
  requests: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
  pub fn new() -> Self {
    Self {
      routes: Mutex::new(HashMap::new()),
      online: AtomicBool::new(true),
      requests: Mutex::new(Vec::new()),
    }
  }

  pub fn serve(&self, path: &str, status: u16, body: &str) {
    self.routes.lock().unwrap().insert(
      path.to_string(),
      (StatusCode::from_u16(status).unwrap(), body.as_bytes().to_vec()),
    );
  }

  pub fn go_offline(&self) {
    self.online.store(false, Ordering::SeqCst);
  }

  pub fn go_online(&self) {
    self.online.store(true, Ordering::SeqCst);
  }

  /// Paths requested so far, including ones that failed.
  pub fn requests(&self) -> Vec<String> {
    self.requests.lock().unwrap().clone()
  }
}

#[async_trait]
impl Transport for ScriptedNetwork {
  async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
    let path = request.url.path().to_string();
    self.requests.lock().unwrap().push(path.clone());

    if !self.online.load(Ordering::SeqCst) {
      return Err(FetchError::network(&request.url, "network is unreachable"));
    }

    let routes = self.routes.lock().unwrap();
    Ok(match routes.get(&path) {
      Some((status, body)) => HttpResponse::new(*status, body.clone()),
      None => HttpResponse::new(StatusCode::NOT_FOUND, b"not found".to_vec()),
    })
  }
}

/// Storage wrapper counting every read and write of entries.
pub struct CountingStorage {
  inner: SqliteStorage,
  pub reads: AtomicUsize,
  pub writes: AtomicUsize,
  pub fail_deletes: AtomicBool,
  pub fail_has: AtomicBool,
}

impl CountingStorage {
  pub fn new() -> Self {
    Self {
      inner: SqliteStorage::open_in_memory().unwrap(),
      reads: AtomicUsize::new(0),
      writes: AtomicUsize::new(0),
      fail_deletes: AtomicBool::new(false),
      fail_has: AtomicBool::new(false),
    }
  }

  /// (reads, writes) so far.
  pub fn touches(&self) -> (usize, usize) {
    (
      self.reads.load(Ordering::SeqCst),
      self.writes.load(Ordering::SeqCst),
    )
  }
}

impl CacheStorage for CountingStorage {
  fn open(&self, store: &str) -> Result<()> {
    self.inner.open(store)
  }

  fn has(&self, store: &str) -> Result<bool> {
    if self.fail_has.load(Ordering::SeqCst) {
      return Err(eyre!("database is locked"));
    }
    self.inner.has(store)
  }

  fn keys(&self) -> Result<Vec<String>> {
    self.inner.keys()
  }

  fn delete(&self, store: &str) -> Result<bool> {
    if self.fail_deletes.load(Ordering::SeqCst) {
      return Err(eyre!("disk is read-only"));
    }
    self.inner.delete(store)
  }

  fn match_entry(&self, store: &str, key: &RequestKey) -> Result<Option<CacheEntry>> {
    self.reads.fetch_add(1, Ordering::SeqCst);
    self.inner.match_entry(store, key)
  }

  fn put(&self, store: &str, key: &RequestKey, entry: &CacheEntry) -> Result<()> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    self.inner.put(store, key, entry)
  }

  fn add_all(&self, store: &str, entries: &[(RequestKey, CacheEntry)]) -> Result<()> {
    self.writes.fetch_add(1, Ordering::SeqCst);
    self.inner.add_all(store, entries)
  }

  fn entry_count(&self, store: &str) -> Result<usize> {
    self.inner.entry_count(store)
  }

  fn active_store(&self) -> Result<Option<String>> {
    self.inner.active_store()
  }

  fn set_active_store(&self, store: &str) -> Result<()> {
    self.inner.set_active_store(store)
  }
}

/// Navigator remembering every destination.
#[derive(Default)]
pub struct RecordingNavigator {
  visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
  pub fn visits(&self) -> Vec<String> {
    self.visits.lock().unwrap().clone()
  }
}

impl Navigator for RecordingNavigator {
  fn navigate(&self, path: &str) {
    self.visits.lock().unwrap().push(path.to_string());
  }
}

/// Unwrap an interception the gateway answered itself.
pub fn responded(interception: Interception) -> HttpResponse {
  match interception {
    Interception::Respond(response) => response,
    Interception::Bypass(request) => panic!("expected a response, request to {} was bypassed", request.url),
  }
}
