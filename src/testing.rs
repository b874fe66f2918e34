//! Test doubles shared by the unit tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::error::NetworkError;
use crate::net::Network;
use crate::types::{Request, Response};

pub fn url(s: &str) -> Url {
  Url::parse(s).unwrap()
}

/// Network that serves canned responses and records every call.
///
/// Unknown URLs fail as if offline.
#[derive(Default)]
pub struct FakeNetwork {
  responses: HashMap<String, Response>,
  delay: Option<Duration>,
  calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, url: &str, response: Response) -> Self {
    self.responses.insert(url.to_string(), response);
    self
  }

  /// Sleep before answering each request.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().unwrap().len()
  }
}

#[async_trait]
impl Network for FakeNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
    let url = request.url.to_string();
    self.calls.lock().unwrap().push(url.clone());

    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }

    self
      .responses
      .get(&url)
      .cloned()
      .ok_or(NetworkError::Offline(url))
  }
}
