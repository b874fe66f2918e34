use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use ledgerflow_cache::{
  CacheInterceptor, CacheStorage, Config, HttpNetwork, Request, SqliteStorage, WorkerHost,
};

#[derive(Parser, Debug)]
#[command(name = "ledgerflow-cache")]
#[command(about = "Pre-cache a site's assets and serve requests cache-first")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/ledgerflow-cache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL that resource paths resolve against
  #[arg(short, long)]
  scope: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Fetch and store every configured resource
  Install,
  /// Serve requests through the cache, falling back to the network
  Fetch {
    /// Absolute URLs or paths relative to the scope
    #[arg(required = true)]
    targets: Vec<String>,
  },
  /// List the URLs stored in the configured cache
  Keys,
  /// List the caches in the store
  Caches,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;

  // Override scope if specified on command line
  let config = if let Some(scope) = args.scope {
    Config { scope, ..config }
  } else {
    config
  };

  let _log_guard = init_logging(config.log_file.as_deref())?;

  let worker = config.worker_config()?;
  let storage = Arc::new(SqliteStorage::open(&config.database_path()?)?);
  let network = HttpNetwork::new()?;
  let interceptor = Arc::new(CacheInterceptor::new(
    worker,
    Arc::clone(&storage),
    network,
  ));

  match args.command {
    Command::Install => {
      let host = WorkerHost::spawn(Arc::clone(&interceptor));
      host.install().await?;
      let cache = interceptor.open_cache()?;
      println!(
        "Installed {} resources into {}",
        cache.keys()?.len(),
        cache.name()
      );
    }
    Command::Fetch { targets } => {
      let requests = targets
        .iter()
        .map(|target| {
          interceptor
            .config()
            .resolve(target)
            .map(Request::get)
            .map_err(|e| eyre!("Invalid target '{}': {}", target, e))
        })
        .collect::<Result<Vec<_>>>()?;

      let results = join_all(
        requests
          .into_iter()
          .map(|request| {
            let interceptor = Arc::clone(&interceptor);
            async move {
              let url = request.url.to_string();
              (url, interceptor.fetch_with_source(request).await)
            }
          }),
      )
      .await;

      let mut failed = 0;
      for (url, result) in results {
        match result {
          Ok(served) => println!(
            "{}\t{}\t{}\t{}",
            served.response.status,
            served.source,
            served.response.body.len(),
            url
          ),
          Err(e) => {
            eprintln!("error\t{}\t{}", url, e);
            failed += 1;
          }
        }
      }

      if failed > 0 {
        return Err(eyre!("{} request(s) failed", failed));
      }
    }
    Command::Keys => {
      for url in interceptor.cache().keys()? {
        println!("{}", url);
      }
    }
    Command::Caches => {
      for name in storage.cache_names()? {
        println!("{}", name);
      }
    }
  }

  Ok(())
}

/// Log to stderr, or to a file when one is configured.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s work.
fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

  match log_file {
    Some(path) => {
      let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
      let file_name = path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file path: {}", path.display()))?;

      let appender = tracing_appender::rolling::never(dir, file_name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
      Ok(None)
    }
  }
}
