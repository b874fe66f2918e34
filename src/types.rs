//! Request and response values passed between the page, the cache and the network.

use std::collections::BTreeMap;
use url::Url;

/// An outbound request made by a controlled page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: String,
  pub url: Url,
  /// Header names are stored lowercased
  pub headers: BTreeMap<String, String>,
}

impl Request {
  /// A plain `GET` request with no headers.
  pub fn get(url: Url) -> Self {
    Self {
      method: "GET".to_string(),
      url,
      headers: BTreeMap::new(),
    }
  }

  /// Set a header, replacing any previous value.
  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self
      .headers
      .insert(name.to_ascii_lowercase(), value.to_string());
    self
  }

  pub fn with_method(mut self, method: &str) -> Self {
    self.method = method.to_ascii_uppercase();
    self
  }

  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .get(&name.to_ascii_lowercase())
      .map(String::as_str)
  }

  pub fn is_get(&self) -> bool {
    self.method.eq_ignore_ascii_case("GET")
  }

  /// The URL this request is identified by in the cache (fragment removed).
  pub fn cache_url(&self) -> Url {
    let mut url = self.url.clone();
    url.set_fragment(None);
    url
  }
}

/// A response, either stored in the cache or fresh from the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  /// Final URL after redirects, when known
  pub url: Option<String>,
  pub status: u16,
  pub status_text: String,
  /// Header names are stored lowercased, in the order received
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl Response {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      url: None,
      status,
      status_text: String::new(),
      headers: Vec::new(),
      body: body.into(),
    }
  }

  pub fn with_header(mut self, name: &str, value: &str) -> Self {
    self
      .headers
      .push((name.to_ascii_lowercase(), value.to_string()));
    self
  }

  /// First value of the named header.
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(k, _)| k.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }

  /// True for 2xx statuses.
  pub fn ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Request header names listed in the `Vary` header, lowercased.
  pub fn vary(&self) -> Vec<String> {
    self
      .headers
      .iter()
      .filter(|(k, _)| k.eq_ignore_ascii_case("vary"))
      .flat_map(|(_, v)| v.split(','))
      .map(|name| name.trim().to_ascii_lowercase())
      .filter(|name| !name.is_empty())
      .collect()
  }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
  /// Stored in the cache at install time
  Cache,
  /// Forwarded to the network on a cache miss
  Network,
}

impl std::fmt::Display for ResponseSource {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Cache => write!(f, "cache"),
      Self::Network => write!(f, "network"),
    }
  }
}

/// A response together with its source.
#[derive(Debug, Clone)]
pub struct Served {
  pub response: Response,
  pub source: ResponseSource,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_cache_url_drops_fragment() {
    let request = Request::get(Url::parse("http://localhost:8501/index.html#top").unwrap());
    assert_eq!(request.cache_url().as_str(), "http://localhost:8501/index.html");
  }

  #[test]
  fn test_header_names_are_case_insensitive() {
    let request = Request::get(Url::parse("http://localhost/").unwrap()).with_header("Accept", "text/html");
    assert_eq!(request.header("accept"), Some("text/html"));
    assert_eq!(request.header("ACCEPT"), Some("text/html"));
  }

  #[test]
  fn test_vary_splits_and_lowercases() {
    let response = Response::new(200, "x")
      .with_header("Vary", "Accept-Encoding, Accept")
      .with_header("vary", "Origin");
    assert_eq!(response.vary(), vec!["accept-encoding", "accept", "origin"]);
  }

  #[test]
  fn test_ok_range() {
    assert!(Response::new(200, "").ok());
    assert!(Response::new(204, "").ok());
    assert!(!Response::new(304, "").ok());
    assert!(!Response::new(404, "").ok());
  }
}
