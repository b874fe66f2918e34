//! Handle on a single named cache.

use color_eyre::Result;
use futures::future::try_join_all;
use std::collections::HashSet;
use std::sync::Arc;

use super::key::{request_key, vary_matches, vary_values};
use super::storage::{CacheStorage, CachedResponse, StoredEntry};
use crate::error::CacheError;
use crate::net::Network;
use crate::types::Request;

/// A named cache inside a storage backend.
///
/// Handles opened with the same name share the same entries.
pub struct Cache<S: CacheStorage> {
  name: String,
  storage: Arc<S>,
}

impl<S: CacheStorage> Cache<S> {
  /// Open (or create) the named cache.
  pub fn open(storage: Arc<S>, name: &str) -> Result<Self> {
    storage.open_cache(name)?;
    Ok(Self {
      name: name.to_string(),
      storage,
    })
  }

  /// Handle on the named cache without creating it.
  ///
  /// Lookups through a handle on a cache that was never opened simply miss.
  pub fn handle(storage: Arc<S>, name: &str) -> Self {
    Self {
      name: name.to_string(),
      storage,
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Fetch every request and store all responses, or store nothing.
  ///
  /// Requests are fetched concurrently. The first failure aborts the whole
  /// operation before anything is written.
  pub async fn add_all<N>(&self, network: &N, requests: &[Request]) -> Result<(), CacheError>
  where
    N: Network + ?Sized,
  {
    let mut seen = HashSet::new();
    for request in requests {
      if !matches!(request.url.scheme(), "http" | "https") {
        return Err(CacheError::InvalidResource {
          path: request.url.to_string(),
          reason: format!("unsupported scheme '{}'", request.url.scheme()),
        });
      }
      if !request.is_get() {
        return Err(CacheError::InvalidResource {
          path: request.url.to_string(),
          reason: format!("only GET requests can be cached, got {}", request.method),
        });
      }
      if !seen.insert(request_key(request)) {
        return Err(CacheError::DuplicateRequest(request.cache_url().to_string()));
      }
    }

    let entries = try_join_all(requests.iter().map(|request| async move {
      let url = request.cache_url().to_string();
      let response = network
        .fetch(request)
        .await
        .map_err(|source| CacheError::Fetch {
          url: url.clone(),
          source,
        })?;

      // Partial content is never a complete copy of the resource
      if !response.ok() || response.status == 206 {
        return Err(CacheError::BadStatus {
          url,
          status: response.status,
        });
      }
      if response.vary().iter().any(|name| name == "*") {
        return Err(CacheError::VaryWildcard(url));
      }

      Ok::<_, CacheError>(StoredEntry {
        key: request_key(request),
        vary: vary_values(request, &response),
        url,
        response,
      })
    }))
    .await?;

    self
      .storage
      .put_all(&self.name, &entries)
      .map_err(CacheError::Storage)
  }

  /// Find the stored response for a request.
  ///
  /// Non-GET requests never match.
  pub fn match_request(&self, request: &Request) -> Result<Option<CachedResponse>> {
    if !request.is_get() {
      return Ok(None);
    }

    let cached = self.storage.lookup(&self.name, &request_key(request))?;
    Ok(cached.filter(|c| vary_matches(request, &c.vary)))
  }

  /// Stored request URLs in insertion order.
  pub fn keys(&self) -> Result<Vec<String>> {
    self.storage.keys(&self.name)
  }
}

impl<S: CacheStorage> Clone for Cache<S> {
  fn clone(&self) -> Self {
    Self {
      name: self.name.clone(),
      storage: Arc::clone(&self.storage),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::SqliteStorage;
  use crate::testing::{url, FakeNetwork};
  use crate::types::Response;

  fn open(name: &str) -> (Arc<SqliteStorage>, Cache<SqliteStorage>) {
    let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
    let cache = Cache::open(Arc::clone(&storage), name).unwrap();
    (storage, cache)
  }

  #[tokio::test]
  async fn test_add_all_stores_every_response() {
    let (_, cache) = open("c");
    let network = FakeNetwork::new()
      .with("http://host/", Response::new(200, "root"))
      .with("http://host/app.js", Response::new(200, "js"));

    cache
      .add_all(
        &network,
        &[Request::get(url("http://host/")), Request::get(url("http://host/app.js"))],
      )
      .await
      .unwrap();

    assert_eq!(cache.keys().unwrap(), vec!["http://host/", "http://host/app.js"]);
    let hit = cache.match_request(&Request::get(url("http://host/app.js"))).unwrap();
    assert_eq!(hit.unwrap().response.body, b"js");
  }

  #[tokio::test]
  async fn test_add_all_rejects_bad_status_without_writing() {
    let (_, cache) = open("c");
    let network = FakeNetwork::new()
      .with("http://host/", Response::new(200, "root"))
      .with("http://host/gone", Response::new(404, "nope"));

    let err = cache
      .add_all(
        &network,
        &[Request::get(url("http://host/")), Request::get(url("http://host/gone"))],
      )
      .await
      .unwrap_err();

    assert!(matches!(err, CacheError::BadStatus { status: 404, .. }));
    assert!(cache.keys().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_add_all_rejects_partial_content() {
    let (_, cache) = open("c");
    let network = FakeNetwork::new()
      .with("http://host/", Response::new(200, "root"))
      .with("http://host/video.mp4", Response::new(206, "partial"));

    let err = cache
      .add_all(
        &network,
        &[Request::get(url("http://host/")), Request::get(url("http://host/video.mp4"))],
      )
      .await
      .unwrap_err();

    assert!(matches!(err, CacheError::BadStatus { status: 206, .. }));
    assert!(cache.keys().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_add_all_rejects_duplicates_before_fetching() {
    let (_, cache) = open("c");
    let network = FakeNetwork::new().with("http://host/", Response::new(200, "root"));

    let err = cache
      .add_all(
        &network,
        &[Request::get(url("http://host/")), Request::get(url("http://host/#again"))],
      )
      .await
      .unwrap_err();

    assert!(matches!(err, CacheError::DuplicateRequest(_)));
    assert_eq!(network.call_count(), 0);
  }

  #[tokio::test]
  async fn test_add_all_rejects_vary_wildcard() {
    let (_, cache) = open("c");
    let network = FakeNetwork::new().with(
      "http://host/",
      Response::new(200, "root").with_header("Vary", "*"),
    );

    let err = cache
      .add_all(&network, &[Request::get(url("http://host/"))])
      .await
      .unwrap_err();

    assert!(matches!(err, CacheError::VaryWildcard(_)));
  }

  #[tokio::test]
  async fn test_add_all_rejects_non_http_scheme() {
    let (_, cache) = open("c");
    let network = FakeNetwork::new();

    let err = cache
      .add_all(&network, &[Request::get(url("file:///etc/hosts"))])
      .await
      .unwrap_err();

    assert!(matches!(err, CacheError::InvalidResource { .. }));
  }

  #[tokio::test]
  async fn test_match_ignores_non_get() {
    let (_, cache) = open("c");
    let network = FakeNetwork::new().with("http://host/", Response::new(200, "root"));
    cache
      .add_all(&network, &[Request::get(url("http://host/"))])
      .await
      .unwrap();

    let post = Request::get(url("http://host/")).with_method("POST");
    assert!(cache.match_request(&post).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_match_honours_vary() {
    let (_, cache) = open("c");
    let network = FakeNetwork::new().with(
      "http://host/",
      Response::new(200, "html").with_header("Vary", "Accept"),
    );
    let stored = Request::get(url("http://host/")).with_header("Accept", "text/html");
    cache.add_all(&network, &[stored.clone()]).await.unwrap();

    assert!(cache.match_request(&stored).unwrap().is_some());
    let json = Request::get(url("http://host/")).with_header("Accept", "application/json");
    assert!(cache.match_request(&json).unwrap().is_none());
  }

  #[tokio::test]
  async fn test_same_name_shares_entries() {
    let (storage, first) = open("ledgerflow-cache-v1");
    let second = Cache::open(Arc::clone(&storage), "ledgerflow-cache-v1").unwrap();
    let network = FakeNetwork::new().with("http://host/", Response::new(200, "root"));

    first
      .add_all(&network, &[Request::get(url("http://host/"))])
      .await
      .unwrap();

    assert!(second
      .match_request(&Request::get(url("http://host/")))
      .unwrap()
      .is_some());
    assert_eq!(storage.cache_names().unwrap(), vec!["ledgerflow-cache-v1"]);
  }
}
