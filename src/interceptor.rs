//! Cache-first request interceptor.

use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{Cache, CacheStorage};
use crate::config::WorkerConfig;
use crate::error::{CacheError, FetchError};
use crate::net::Network;
use crate::types::{Request, Response, ResponseSource, Served};

/// Serves requests from one named cache, falling through to the network.
///
/// The cache only grows during [`handle_install`](Self::handle_install);
/// responses fetched on a miss are never stored.
pub struct CacheInterceptor<S: CacheStorage, N: Network> {
  config: WorkerConfig,
  storage: Arc<S>,
  network: N,
}

impl<S: CacheStorage, N: Network> CacheInterceptor<S, N> {
  pub fn new(config: WorkerConfig, storage: Arc<S>, network: N) -> Self {
    Self {
      config,
      storage,
      network,
    }
  }

  pub fn config(&self) -> &WorkerConfig {
    &self.config
  }

  pub fn network(&self) -> &N {
    &self.network
  }

  /// Open (or create) the named cache.
  pub fn open_cache(&self) -> color_eyre::Result<Cache<S>> {
    Cache::open(Arc::clone(&self.storage), &self.config.cache_name)
  }

  /// Read-only handle on the named cache; never writes to the store.
  pub fn cache(&self) -> Cache<S> {
    Cache::handle(Arc::clone(&self.storage), &self.config.cache_name)
  }

  /// The resource list resolved against the scope.
  pub fn precache_requests(&self) -> Result<Vec<Request>, CacheError> {
    self
      .config
      .resources
      .iter()
      .map(|path| {
        self
          .config
          .resolve(path)
          .map(Request::get)
          .map_err(|e| CacheError::InvalidResource {
            path: path.clone(),
            reason: e.to_string(),
          })
      })
      .collect()
  }

  /// Populate the cache with every configured resource.
  ///
  /// Completes only once all resources are stored, or fails as a whole.
  pub async fn handle_install(&self) -> Result<(), CacheError> {
    let cache = self.open_cache().map_err(CacheError::Storage)?;
    info!(cache = cache.name(), "Opened cache");

    let requests = self.precache_requests()?;
    cache.add_all(&self.network, &requests).await?;

    info!(
      cache = cache.name(),
      resources = requests.len(),
      "Pre-cached resources"
    );
    Ok(())
  }

  /// Answer a request from the cache, or from the network on a miss.
  pub async fn handle_fetch(&self, request: Request) -> Result<Response, FetchError> {
    self
      .fetch_with_source(request)
      .await
      .map(|served| served.response)
  }

  /// Like [`handle_fetch`](Self::handle_fetch), also reporting where the response came from.
  pub async fn fetch_with_source(&self, request: Request) -> Result<Served, FetchError> {
    let cache = self.cache();

    if let Some(cached) = cache
      .match_request(&request)
      .map_err(FetchError::Cache)?
    {
      debug!(url = %request.url, cached_at = %cached.cached_at, "Cache hit");
      return Ok(Served {
        response: cached.response,
        source: ResponseSource::Cache,
      });
    }

    debug!(url = %request.url, "Cache miss, forwarding to network");
    let response = self.network.fetch(&request).await?;
    Ok(Served {
      response,
      source: ResponseSource::Network,
    })
  }
}
