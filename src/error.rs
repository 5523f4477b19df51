//! Failure taxonomy for starting and running the service.
//!
//! Hook failures and drain timeouts are not errors: shutdown still completes,
//! so they are reported through [`ShutdownReport`](crate::lifecycle::ShutdownReport).

use thiserror::Error;

use crate::config::ConfigError;
use crate::http::routes::RouteError;
use crate::net::listener::ListenerError;
use crate::observability::tracer::TracerError;

/// Fatal problems before the service accepts traffic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("route table rejected: {0}")]
    Routes(#[from] RouteError),

    #[error("cannot init tracer: {0}")]
    Tracer(#[from] TracerError),

    #[error("listener failed: {0}")]
    Listener(#[from] ListenerError),

    #[error("service already started")]
    AlreadyStarted,
}

/// Fatal problems over the whole run.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// The serve task ended without a stop request.
    #[error("listener died unexpectedly: {0}")]
    AcceptTask(String),
}
