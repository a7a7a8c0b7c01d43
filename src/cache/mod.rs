//! Persisted offline cache for intercepted requests.
//!
//! This module provides the versioned request/response store that:
//! - Keeps one named store per cache generation
//! - Keys entries by canonical request (method + URL)
//! - Replaces whole entries on write, never partially
//! - Survives process restarts, so it doubles as the only meeting point
//!   between the application and the gateway worker

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, SqliteStorage};
pub use traits::{CacheEntry, CacheSource, CacheVersion, RequestKey};
