//! Error types for the install and fetch phases.

use thiserror::Error;

/// Failure of the network primitive.
#[derive(Error, Debug)]
pub enum NetworkError {
  #[error("request to {url} failed: {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("failed to build HTTP client: {0}")]
  Client(#[source] reqwest::Error),

  #[error("invalid request method: {0}")]
  InvalidMethod(String),

  #[error("network unavailable for {0}")]
  Offline(String),
}

/// Install-time population failure.
///
/// Any of these fails the install as a whole; nothing is written to the cache.
#[derive(Error, Debug)]
pub enum CacheError {
  #[error("cache storage error: {0}")]
  Storage(color_eyre::Report),

  #[error("invalid resource '{path}': {reason}")]
  InvalidResource { path: String, reason: String },

  #[error("resource listed more than once: {0}")]
  DuplicateRequest(String),

  #[error("failed to fetch {url}: {source}")]
  Fetch {
    url: String,
    #[source]
    source: NetworkError,
  },

  #[error("bad response for {url}: status {status}")]
  BadStatus { url: String, status: u16 },

  #[error("response for {0} has 'Vary: *' and cannot be cached")]
  VaryWildcard(String),

  #[error("worker is redundant after a failed install")]
  Redundant,

  #[error("worker host has shut down")]
  HostClosed,
}

/// Fetch-time resolution failure: neither the cache nor the network answered.
#[derive(Error, Debug)]
pub enum FetchError {
  #[error("cache lookup failed: {0}")]
  Cache(color_eyre::Report),

  #[error(transparent)]
  Network(#[from] NetworkError),

  #[error("worker host has shut down")]
  HostClosed,
}
