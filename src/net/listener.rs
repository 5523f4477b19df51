//! TCP listener and the background serve task.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Run the accept/serve loop on its own task
//! - Stop accepting on request and drain within a deadline
//!
//! # States
//! ```text
//! Running → Draining → Closed
//! ```

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, watch};
use tokio::task::{JoinError, JoinHandle, JoinSet};

use crate::lifecycle::shutdown::DrainOutcome;
use crate::net::connection::InFlightTracker;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind { address: String, source: io::Error },
    /// The serve task died before reporting ready.
    Spawn(String),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind { address, source } => {
                write!(f, "Failed to bind {}: {}", address, source)
            }
            ListenerError::Spawn(reason) => write!(f, "Failed to start serve task: {}", reason),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Bind { source, .. } => Some(source),
            ListenerError::Spawn(_) => None,
        }
    }
}

/// Listener lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Accepting connections.
    Running,
    /// No new connections, finishing in-flight requests.
    Draining,
    /// Serve task finished or was aborted.
    Closed,
}

/// How the serve task ended.
pub(crate) type ServeExit = Result<io::Result<()>, JoinError>;

/// Bind a TCP listener to `address`.
pub async fn bind(address: &str) -> Result<TcpListener, ListenerError> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| ListenerError::Bind {
            address: address.to_string(),
            source,
        })?;

    if let Ok(local_addr) = listener.local_addr() {
        tracing::info!(address = %local_addr, "Listener bound");
    }

    Ok(listener)
}

/// The bound listener, its serve task, and its active-request count.
#[derive(Debug)]
pub struct ListenerHandle {
    local_addr: SocketAddr,
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<io::Result<()>>,
    tracker: InFlightTracker,
    state: ListenerState,
}

impl ListenerHandle {
    /// Start serving `app` on a background task.
    ///
    /// Returns once the task is running, so callers may rely on the listener
    /// accepting connections.
    pub async fn spawn(
        listener: TcpListener,
        app: Router,
        tracker: InFlightTracker,
    ) -> Result<Self, ListenerError> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| ListenerError::Spawn(e.to_string()))?;
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let _ = ready_tx.send(());
            serve(listener, app, stop_rx).await
        });

        ready_rx
            .await
            .map_err(|_| ListenerError::Spawn("serve task exited before start".to_string()))?;

        tracing::info!(address = %local_addr, "HTTP server accepting connections");

        Ok(Self {
            local_addr,
            stop_tx: Some(stop_tx),
            task,
            tracker,
            state: ListenerState::Running,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn in_flight(&self) -> u64 {
        self.tracker.in_flight()
    }

    /// Ask the serve task to stop accepting. Only the first call has an effect.
    pub fn stop(&mut self) -> bool {
        match self.stop_tx.take() {
            Some(tx) => {
                let _ = tx.send(());
                self.state = ListenerState::Draining;
                tracing::info!(in_flight = self.tracker.in_flight(), "Listener stopped accepting");
                true
            }
            None => false,
        }
    }

    /// Stop accepting and wait up to `deadline` for in-flight requests.
    ///
    /// When the deadline elapses the serve task is aborted and the timeout is
    /// reported, never hidden.
    pub async fn drain(mut self, deadline: Duration) -> DrainOutcome {
        let started = Instant::now();
        self.stop();

        let outcome = match tokio::time::timeout(deadline, &mut self.task).await {
            Ok(Ok(Ok(()))) => DrainOutcome::Completed {
                elapsed: started.elapsed(),
            },
            Ok(Ok(Err(e))) => DrainOutcome::Failed {
                reason: e.to_string(),
            },
            Ok(Err(e)) => DrainOutcome::Failed {
                reason: e.to_string(),
            },
            Err(_) => {
                let in_flight = self.tracker.in_flight();
                // Dropping the serve task drops its connection set, which aborts
                // every connection still open.
                self.task.abort();
                let _ = (&mut self.task).await;
                DrainOutcome::TimedOut {
                    in_flight,
                    deadline,
                }
            }
        };
        self.state = ListenerState::Closed;

        match &outcome {
            DrainOutcome::Completed { elapsed } => {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "Drain completed");
            }
            DrainOutcome::TimedOut {
                in_flight,
                deadline,
            } => {
                tracing::error!(
                    in_flight = *in_flight,
                    deadline_ms = deadline.as_millis() as u64,
                    "Server forced to shutdown: drain deadline elapsed"
                );
            }
            DrainOutcome::Failed { reason } => {
                tracing::error!(error = %reason, "Serve task failed while draining");
            }
        }

        outcome
    }

    /// Kill the serve task without a stop request.
    #[cfg(test)]
    pub(crate) fn abort_serve_task(&self) {
        self.task.abort();
    }

    /// Resolve when the serve task ends on its own.
    ///
    /// Must not be polled again after it resolves.
    pub(crate) async fn exited(&mut self) -> ServeExit {
        (&mut self.task).await
    }
}

/// Describe a serve task that ended without being asked to stop.
pub(crate) fn describe_unexpected_exit(exit: ServeExit) -> String {
    match exit {
        Ok(Ok(())) => "serve task returned without a stop request".to_string(),
        Ok(Err(e)) => format!("serve task failed: {}", e),
        Err(e) if e.is_panic() => "serve task panicked".to_string(),
        Err(e) => format!("serve task aborted: {}", e),
    }
}

/// Accept loop. Every connection runs on its own task inside a `JoinSet`
/// owned by this future, so aborting the serve task closes all of them.
async fn serve(
    listener: TcpListener,
    app: Router,
    mut stop_rx: oneshot::Receiver<()>,
) -> io::Result<()> {
    let (close_tx, close_rx) = watch::channel(false);
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            // A dropped sender also stops the server.
            _ = &mut stop_rx => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::trace!(peer = %peer, "Connection accepted");
                    connections.spawn(serve_connection(stream, app.clone(), close_rx.clone()));
                }
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(error = %e, "Connection failed before accept");
                }
                Err(e) => return Err(e),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    let _ = close_tx.send(true);
    tracing::debug!(open = connections.len(), "Waiting for open connections");
    while connections.join_next().await.is_some() {}

    Ok(())
}

async fn serve_connection(stream: TcpStream, app: Router, mut close_rx: watch::Receiver<bool>) {
    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection_with_upgrades(
        TokioIo::new(stream),
        TowerToHyperService::new(app),
    );
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = async { close_rx.wait_for(|closing| *closing).await.map(|_| ()) } => {
            // Finish the request in progress, then close.
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Connection closed with error");
    }
}

/// Errors that concern a single connection, not the listener.
fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
