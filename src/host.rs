//! Host adapter that delivers lifecycle and fetch events to the interceptor.
//!
//! Each event is held open until the interceptor's future settles; the reply
//! channel only fires once the work is done.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::debug;

use crate::cache::CacheStorage;
use crate::error::{CacheError, FetchError};
use crate::interceptor::CacheInterceptor;
use crate::net::Network;
use crate::types::{Request, Response};

/// Lifecycle state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  /// Registered, install not yet attempted
  Parsed,
  /// Install event in flight
  Installing,
  /// Install succeeded; fetches are intercepted
  Installed,
  /// Install failed; the worker will never control a page
  Redundant,
}

/// Events the host delivers to the worker.
#[derive(Debug)]
pub enum WorkerEvent {
  Install {
    done: oneshot::Sender<Result<(), CacheError>>,
  },
  Fetch {
    request: Request,
    respond_with: oneshot::Sender<Result<Response, FetchError>>,
  },
}

/// Handle for dispatching events to a running worker.
#[derive(Clone)]
pub struct WorkerHost {
  tx: mpsc::UnboundedSender<WorkerEvent>,
  state: Arc<watch::Sender<WorkerState>>,
}

impl WorkerHost {
  /// Start the event loop for a worker.
  pub fn spawn<S, N>(interceptor: Arc<CacheInterceptor<S, N>>) -> Self
  where
    S: CacheStorage + 'static,
    N: Network + 'static,
  {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (state, _) = watch::channel(WorkerState::Parsed);
    let state = Arc::new(state);

    let loop_state = Arc::clone(&state);
    tokio::spawn(async move {
      while let Some(event) = rx.recv().await {
        match event {
          WorkerEvent::Install { done } => {
            let interceptor = Arc::clone(&interceptor);
            let state = Arc::clone(&loop_state);
            tokio::spawn(async move {
              let result = install(&interceptor, &state).await;
              // The caller may have stopped waiting; the outcome is already recorded
              let _ = done.send(result);
            });
          }
          WorkerEvent::Fetch {
            request,
            respond_with,
          } => {
            let interceptor = Arc::clone(&interceptor);
            let controlled = *loop_state.borrow() == WorkerState::Installed;
            tokio::spawn(async move {
              let result = if controlled {
                interceptor.handle_fetch(request).await
              } else {
                debug!(url = %request.url, "Worker not installed, passing request through");
                interceptor
                  .network()
                  .fetch(&request)
                  .await
                  .map_err(FetchError::from)
              };
              let _ = respond_with.send(result);
            });
          }
        }
      }
    });

    Self { tx, state }
  }

  pub fn state(&self) -> WorkerState {
    *self.state.borrow()
  }

  /// Run the install phase and wait until it has settled.
  pub async fn install(&self) -> Result<(), CacheError> {
    let (done, rx) = oneshot::channel();
    self
      .tx
      .send(WorkerEvent::Install { done })
      .map_err(|_| CacheError::HostClosed)?;

    rx.await.map_err(|_| CacheError::HostClosed)?
  }

  /// Dispatch a fetch event and wait for its response.
  pub async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
    let (respond_with, rx) = oneshot::channel();
    self
      .tx
      .send(WorkerEvent::Fetch {
        request,
        respond_with,
      })
      .map_err(|_| FetchError::HostClosed)?;

    rx.await.map_err(|_| FetchError::HostClosed)?
  }
}

async fn install<S, N>(
  interceptor: &CacheInterceptor<S, N>,
  state: &watch::Sender<WorkerState>,
) -> Result<(), CacheError>
where
  S: CacheStorage,
  N: Network,
{
  let claimed = state.send_if_modified(|s| {
    if *s == WorkerState::Parsed {
      *s = WorkerState::Installing;
      true
    } else {
      false
    }
  });

  if !claimed {
    // Another install event owns the phase; settle with its outcome
    let mut rx = state.subscribe();
    let settled = *rx
      .wait_for(|s| *s != WorkerState::Installing)
      .await
      .map_err(|_| CacheError::HostClosed)?;
    return match settled {
      WorkerState::Redundant => Err(CacheError::Redundant),
      _ => Ok(()),
    };
  }

  match interceptor.handle_install().await {
    Ok(()) => {
      state.send_replace(WorkerState::Installed);
      Ok(())
    }
    Err(e) => {
      debug!(error = %e, "Install failed, worker is redundant");
      state.send_replace(WorkerState::Redundant);
      Err(e)
    }
  }
}
