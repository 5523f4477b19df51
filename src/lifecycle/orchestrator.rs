//! Service lifecycle orchestration.
//!
//! # States
//! ```text
//! Idle → Starting → Running → ShuttingDown → Closed
//! ```
//!
//! - **Starting**: settings validated, router built, tracer installed, listener bound
//! - **Running**: serve task accepting; main task suspended on the signal wait
//! - **ShuttingDown**: hooks run in order, then the listener drains
//! - **Closed**: terminal, also reached on any startup failure

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use tokio::sync::watch;

use crate::config::validation::validate_settings;
use crate::config::{ConfigError, ServiceConfig, ServiceSettings};
use crate::error::{LifecycleError, StartupError};
use crate::http::middleware::{Middleware, MiddlewareChain};
use crate::http::routes::RouteTable;
use crate::lifecycle::hooks::{SealedHooks, ShutdownHooks};
use crate::lifecycle::shutdown::{ShutdownReport, GRACE_DEADLINE};
use crate::net::connection::{track_in_flight, InFlightTracker};
use crate::net::listener::{self, describe_unexpected_exit, ListenerHandle, ListenerState};
use crate::observability::tracer::{self, Tracer};

/// Lifecycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Idle,
    Starting,
    Running,
    ShuttingDown,
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Starting => write!(f, "starting"),
            Self::Running => write!(f, "running"),
            Self::ShuttingDown => write!(f, "shutting_down"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

fn transition(state: &watch::Sender<LifecycleState>, next: LifecycleState) {
    let previous = state.send_replace(next);
    tracing::info!(from = %previous, to = %next, "Lifecycle transition");
}

/// Owns the service configuration and drives it through its lifecycle.
pub struct Orchestrator {
    pending: Option<ServiceConfig>,
    grace_deadline: Duration,
    state: watch::Sender<LifecycleState>,
}

impl Orchestrator {
    pub fn new(config: ServiceConfig) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        Self {
            pending: Some(config),
            grace_deadline: GRACE_DEADLINE,
            state,
        }
    }

    /// Override the drain deadline. Intended for tests.
    pub fn with_grace_deadline(mut self, deadline: Duration) -> Self {
        self.grace_deadline = deadline;
        self
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Bring the listener up on a background task.
    ///
    /// Returns once the listener is accepting. Any failure leaves the
    /// orchestrator `Closed`; a second call fails with `AlreadyStarted`.
    pub async fn start(&mut self) -> Result<RunningService, StartupError> {
        let config = self.pending.take().ok_or_else(|| {
            tracing::error!(state = %self.state(), "Refusing to start the listener twice");
            StartupError::AlreadyStarted
        })?;

        transition(&self.state, LifecycleState::Starting);

        match bring_up(config, self.grace_deadline, self.state.clone()).await {
            Ok(running) => {
                transition(&self.state, LifecycleState::Running);
                Ok(running)
            }
            Err(e) => {
                tracing::error!(error = %e, "Startup failed");
                transition(&self.state, LifecycleState::Closed);
                Err(e)
            }
        }
    }

    /// Start, wait for `signal`, then shut down.
    pub async fn run_until<F>(mut self, signal: F) -> Result<ShutdownReport, LifecycleError>
    where
        F: Future,
    {
        let running = self.start().await?;
        running.run_until(signal).await
    }
}

/// Build and start everything in `config`.
///
/// Takes owned values only, so the returned future stays `Send`. Hooks
/// registered so far (tracer close included) run when any step fails.
async fn bring_up(
    config: ServiceConfig,
    grace_deadline: Duration,
    state: watch::Sender<LifecycleState>,
) -> Result<RunningService, StartupError> {
    let ServiceConfig {
        settings,
        routes,
        middleware,
        mut hooks,
    } = config;

    let started = assemble(&settings, routes, middleware, &mut hooks).await;

    // No registration past this point.
    let hooks = hooks.seal();

    let (listener, tracer) = match started {
        Ok(started) => started,
        Err(e) => {
            if !hooks.is_empty() {
                let report = hooks.run_all();
                tracing::warn!(
                    executed = report.executed.len(),
                    failed = report.failures.len(),
                    "Shutdown hooks run after failed startup"
                );
            }
            return Err(e);
        }
    };

    tracing::info!(
        address = %listener.local_addr(),
        environment = %settings.environment,
        tracing_enabled = tracer.is_some(),
        shutdown_hooks = hooks.len(),
        "Service started"
    );

    Ok(RunningService {
        listener,
        hooks,
        tracer,
        grace_deadline,
        state,
    })
}

async fn assemble(
    settings: &ServiceSettings,
    routes: RouteTable,
    mut middleware: Vec<Middleware>,
    hooks: &mut ShutdownHooks,
) -> Result<(ListenerHandle, Option<Tracer>), StartupError> {
    validate_settings(settings).map_err(ConfigError::Validation)?;

    let router = routes.into_router()?;
    let tracer = tracer::install(&settings.tracing, hooks, &mut middleware)?;

    let chain = MiddlewareChain::compose(middleware);
    tracing::debug!(chain = ?chain.names(), "Middleware chain composed");

    let tracker = InFlightTracker::new();
    let app = chain
        .apply(router)
        .layer(from_fn_with_state(tracker.clone(), track_in_flight));

    let bound = listener::bind(&settings.listener.address()).await?;
    let listener = ListenerHandle::spawn(bound, app, tracker).await?;

    Ok((listener, tracer))
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.state())
            .field("grace_deadline", &self.grace_deadline)
            .finish_non_exhaustive()
    }
}

/// A started service: the serving listener plus the sealed hooks.
#[derive(Debug)]
pub struct RunningService {
    listener: ListenerHandle,
    hooks: SealedHooks,
    tracer: Option<Tracer>,
    grace_deadline: Duration,
    state: watch::Sender<LifecycleState>,
}

impl RunningService {
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    pub fn in_flight(&self) -> u64 {
        self.listener.in_flight()
    }

    pub fn listener_state(&self) -> ListenerState {
        self.listener.state()
    }

    pub fn tracer(&self) -> Option<&Tracer> {
        self.tracer.as_ref()
    }

    /// Suspend until `signal` resolves, then run the shutdown sequence.
    ///
    /// If the serve task dies first, the run ends with
    /// [`LifecycleError::AcceptTask`] and no drain is attempted.
    pub async fn run_until<F>(mut self, signal: F) -> Result<ShutdownReport, LifecycleError>
    where
        F: Future,
    {
        let died = tokio::select! {
            _ = signal => None,
            exit = self.listener.exited() => Some(exit),
        };

        match died {
            None => Ok(self.shutdown().await),
            Some(exit) => {
                let reason = describe_unexpected_exit(exit);
                tracing::error!(error = %reason, "Listener died, exiting without drain");
                transition(&self.state, LifecycleState::Closed);
                Err(LifecycleError::AcceptTask(reason))
            }
        }
    }

    /// Run every hook in order, then drain the listener within the grace deadline.
    ///
    /// Consumes the service, so the sequence runs at most once.
    pub async fn shutdown(self) -> ShutdownReport {
        let Self {
            listener,
            hooks,
            grace_deadline,
            state,
            ..
        } = self;

        transition(&state, LifecycleState::ShuttingDown);
        tracing::info!(hooks = hooks.len(), "Shutting down server");

        let hooks = hooks.run_all();
        let drain = listener.drain(grace_deadline).await;

        transition(&state, LifecycleState::Closed);

        let report = ShutdownReport { hooks, drain };
        if report.forced() {
            tracing::warn!("Server forced to shutdown");
        } else {
            tracing::info!("Server exiting");
        }
        report
    }
}
