//! Cache-first request interception with install-time pre-caching.
//!
//! A [`CacheInterceptor`] owns one named cache. Installing it fetches a fixed
//! resource list into the cache as a single all-or-nothing operation; every
//! fetch afterwards is answered from the cache when possible and forwarded to
//! the network otherwise, without storing the network result.

pub mod cache;
pub mod config;
pub mod error;
pub mod host;
pub mod interceptor;
pub mod net;
pub mod types;

#[cfg(test)]
mod testing;

pub use cache::{Cache, CacheStorage, SqliteStorage};
pub use config::{Config, WorkerConfig};
pub use error::{CacheError, FetchError, NetworkError};
pub use host::{WorkerHost, WorkerState};
pub use interceptor::CacheInterceptor;
pub use net::{HttpNetwork, Network};
pub use types::{Request, Response, ResponseSource, Served};
