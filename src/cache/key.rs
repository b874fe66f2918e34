//! Request identity used to key stored responses.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::types::{Request, Response};

/// Stable, fixed-length key for a request.
///
/// Only the URL without its fragment takes part; the method is not part of
/// the key because only `GET` requests are ever stored.
pub fn request_key(request: &Request) -> String {
  let mut hasher = Sha256::new();
  hasher.update(request.cache_url().as_str().as_bytes());
  hex::encode(hasher.finalize())
}

/// Capture the request header values a response varies on.
pub fn vary_values(request: &Request, response: &Response) -> BTreeMap<String, Option<String>> {
  response
    .vary()
    .into_iter()
    .map(|name| {
      let value = request.header(&name).map(String::from);
      (name, value)
    })
    .collect()
}

/// Whether a lookup request agrees with the header values captured at store time.
pub fn vary_matches(request: &Request, stored: &BTreeMap<String, Option<String>>) -> bool {
  stored
    .iter()
    .all(|(name, value)| request.header(name) == value.as_deref())
}
