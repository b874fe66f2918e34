use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::cache::SqliteStorage;

pub const DEFAULT_CACHE_NAME: &str = "ledgerflow-cache-v1";
pub const DEFAULT_SCOPE: &str = "http://localhost:8501/";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
  /// Name of the cache the worker owns; bump it to start a fresh cache
  pub cache_name: String,
  /// Base URL that relative resource paths resolve against
  pub scope: String,
  /// Resources fetched and stored during install
  pub precache: Vec<String>,
  /// Cache database location (defaults to the user data directory)
  pub database: Option<PathBuf>,
  /// Write logs here instead of stderr
  pub log_file: Option<PathBuf>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      cache_name: DEFAULT_CACHE_NAME.to_string(),
      scope: DEFAULT_SCOPE.to_string(),
      precache: vec!["./".to_string(), "./index.html".to_string()],
      database: None,
      log_file: None,
    }
  }
}

/// Immutable settings injected into the interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
  pub cache_name: String,
  pub scope: Url,
  pub resources: Vec<String>,
}

impl WorkerConfig {
  pub fn new(cache_name: &str, scope: Url, resources: Vec<String>) -> Self {
    Self {
      cache_name: cache_name.to_string(),
      scope: with_trailing_slash(scope),
      resources,
    }
  }

  /// Resolve a path or absolute URL against the scope.
  pub fn resolve(&self, path: &str) -> Result<Url, url::ParseError> {
    self.scope.join(path)
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./ledgerflow-cache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/ledgerflow-cache/config.yaml
  ///
  /// Falls back to defaults when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("ledgerflow-cache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("ledgerflow-cache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file is a valid config with every default
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Validated settings for the interceptor.
  pub fn worker_config(&self) -> Result<WorkerConfig> {
    let scope = Url::parse(&self.scope)
      .map_err(|e| eyre!("Invalid scope URL '{}': {}", self.scope, e))?;

    if self.cache_name.trim().is_empty() {
      return Err(eyre!("cache_name must not be empty"));
    }

    Ok(WorkerConfig::new(
      &self.cache_name,
      scope,
      self.precache.clone(),
    ))
  }

  /// Cache database path, falling back to the user data directory.
  pub fn database_path(&self) -> Result<PathBuf> {
    match &self.database {
      Some(path) => Ok(path.clone()),
      None => SqliteStorage::default_path(),
    }
  }
}

fn with_trailing_slash(mut url: Url) -> Url {
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  url
}
