//! Network primitive used when the cache has no answer.

use async_trait::async_trait;

use crate::error::NetworkError;
use crate::types::{Request, Response};

/// Performs the actual HTTP request for a cache miss or a pre-cache fetch.
#[async_trait]
pub trait Network: Send + Sync {
  async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// HTTP client wrapper
#[derive(Clone)]
pub struct HttpNetwork {
  client: reqwest::Client,
}

impl HttpNetwork {
  pub fn new() -> Result<Self, NetworkError> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("ledgerflow-cache/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(NetworkError::Client)?;

    Ok(Self { client })
  }
}

#[async_trait]
impl Network for HttpNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
    let method = reqwest::Method::from_bytes(request.method.as_bytes())
      .map_err(|_| NetworkError::InvalidMethod(request.method.clone()))?;

    let mut builder = self.client.request(method, request.url.clone());
    for (name, value) in &request.headers {
      builder = builder.header(name.as_str(), value.as_str());
    }

    let url = request.url.to_string();
    let response = builder
      .send()
      .await
      .map_err(|source| NetworkError::Request {
        url: url.clone(),
        source,
      })?;

    let status = response.status();
    let final_url = response.url().to_string();
    let headers = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|source| NetworkError::Request { url, source })?;

    Ok(Response {
      url: Some(final_url),
      status: status.as_u16(),
      status_text: status.canonical_reason().unwrap_or_default().to_string(),
      headers,
      body: body.to_vec(),
    })
  }
}
