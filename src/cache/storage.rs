//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::types::Response;

/// A response ready to be written under a request key.
#[derive(Debug, Clone)]
pub struct StoredEntry {
  /// Hashed request identity
  pub key: String,
  /// Request URL the key was derived from
  pub url: String,
  /// Request header values named by the response's `Vary` header
  pub vary: BTreeMap<String, Option<String>>,
  pub response: Response,
}

/// A response read back from the store.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub response: Response,
  pub vary: BTreeMap<String, Option<String>>,
  /// When the entry was written
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
///
/// Caches are namespaced by name. Opening a name that already exists refers
/// to the same underlying entries.
pub trait CacheStorage: Send + Sync {
  /// Create the named cache if it does not exist yet.
  fn open_cache(&self, name: &str) -> Result<()>;

  /// Names of all caches, oldest first.
  fn cache_names(&self) -> Result<Vec<String>>;

  /// Store every entry or none of them.
  fn put_all(&self, name: &str, entries: &[StoredEntry]) -> Result<()>;

  /// Get a single entry by request key.
  fn lookup(&self, name: &str, key: &str) -> Result<Option<CachedResponse>>;

  /// Request URLs stored in the named cache, in insertion order.
  fn keys(&self, name: &str) -> Result<Vec<String>>;
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open (or create) a cache database at the given path.
  pub fn open(path: &Path) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)
          .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
      }
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a store that lives only as long as this value.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;

    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;

    Ok(storage)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("ledgerflow-cache").join("cache.db"))
  }

  /// Run database migrations for cache tables.
  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- Named caches
CREATE TABLE IF NOT EXISTS caches (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored responses, one per request key per cache
CREATE TABLE IF NOT EXISTS cache_entries (
    cache_name TEXT NOT NULL,
    request_key TEXT NOT NULL,
    url TEXT NOT NULL,
    vary TEXT NOT NULL,
    status INTEGER NOT NULL,
    status_text TEXT NOT NULL,
    headers TEXT NOT NULL,
    body BLOB NOT NULL,
    response_url TEXT,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, request_key),
    FOREIGN KEY (cache_name) REFERENCES caches(name) ON DELETE CASCADE
);
"#;

impl CacheStorage for SqliteStorage {
  fn open_cache(&self, name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO caches (name) VALUES (?)",
        params![name],
      )
      .map_err(|e| eyre!("Failed to open cache {}: {}", name, e))?;

    Ok(())
  }

  fn cache_names(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM caches ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let names = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to query caches: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache name: {}", e))?;

    Ok(names)
  }

  fn put_all(&self, name: &str, entries: &[StoredEntry]) -> Result<()> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    // Dropping the transaction without commit rolls everything back
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    tx.execute(
      "INSERT OR IGNORE INTO caches (name) VALUES (?)",
      params![name],
    )
    .map_err(|e| eyre!("Failed to open cache {}: {}", name, e))?;

    for entry in entries {
      let vary = serde_json::to_string(&entry.vary)
        .map_err(|e| eyre!("Failed to serialize vary headers: {}", e))?;
      let headers = serde_json::to_string(&entry.response.headers)
        .map_err(|e| eyre!("Failed to serialize response headers: {}", e))?;

      tx.execute(
        "INSERT OR REPLACE INTO cache_entries
           (cache_name, request_key, url, vary, status, status_text, headers, body, response_url, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          name,
          entry.key,
          entry.url,
          vary,
          entry.response.status,
          entry.response.status_text,
          headers,
          entry.response.body,
          entry.response.url,
        ],
      )
      .map_err(|e| eyre!("Failed to store {}: {}", entry.url, e))?;
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }

  fn lookup(&self, name: &str, key: &str) -> Result<Option<CachedResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT vary, status, status_text, headers, body, response_url, cached_at
         FROM cache_entries
         WHERE cache_name = ? AND request_key = ?",
      )
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    type Row = (String, u16, String, String, Vec<u8>, Option<String>, String);
    let row: Option<Row> = stmt
      .query_row(params![name, key], |row| {
        Ok((
          row.get(0)?,
          row.get(1)?,
          row.get(2)?,
          row.get(3)?,
          row.get(4)?,
          row.get(5)?,
          row.get(6)?,
        ))
      })
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry: {}", e))?;

    let Some((vary, status, status_text, headers, body, url, cached_at)) = row else {
      return Ok(None);
    };

    let vary = serde_json::from_str(&vary)
      .map_err(|e| eyre!("Failed to deserialize vary headers: {}", e))?;
    let headers = serde_json::from_str(&headers)
      .map_err(|e| eyre!("Failed to deserialize response headers: {}", e))?;

    Ok(Some(CachedResponse {
      response: Response {
        url,
        status,
        status_text,
        headers,
        body,
      },
      vary,
      cached_at: parse_datetime(&cached_at)?,
    }))
  }

  fn keys(&self, name: &str) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT url FROM cache_entries WHERE cache_name = ? ORDER BY rowid")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let urls = stmt
      .query_map(params![name], |row| row.get(0))
      .map_err(|e| eyre!("Failed to query cache entries: {}", e))?
      .collect::<rusqlite::Result<Vec<String>>>()
      .map_err(|e| eyre!("Failed to read cache entry: {}", e))?;

    Ok(urls)
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
