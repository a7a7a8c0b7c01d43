//! Offline-tolerant gateway and authenticated client for the Beancount
//! bookkeeping app.
//!
//! Two independent halves meet only at the persisted cache:
//!
//! - the [`gateway`] runs in its own task, owns the versioned offline cache
//!   and answers every request network first, falling back to the cache when
//!   the network is unreachable;
//! - the [`client`] is what application code calls; it attaches the stored
//!   credential and tears the [`auth::Session`] down when the backend answers
//!   401.
//!
//! Both classify URLs with the same [`route::RouteClassifier`], so requests
//! to the proxied ledger viewer are neither cached nor authenticated.

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod logging;
pub mod net;
pub mod route;

pub use auth::{FileTokenStore, MemoryTokenStore, Navigator, Session, TokenStore};
pub use cache::{CacheLayer, CacheSource, CacheStorage, CacheVersion, SqliteStorage};
pub use client::ApiClient;
pub use config::Config;
pub use error::ApiError;
pub use gateway::{GatewayHandle, LifecycleState, OfflineGateway};
pub use http::{FetchError, HttpRequest, HttpResponse, Transport};
pub use net::NetworkTransport;
pub use route::{RouteClass, RouteClassifier};
