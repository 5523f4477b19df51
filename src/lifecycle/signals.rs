//! OS signal handling.
//!
//! # Responsibilities
//! - Register SIGINT/SIGTERM handlers eagerly, so installation failure is a startup error
//! - Resolve once on the first termination signal
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers stay installed after the first signal, so a second signal during
//!   shutdown is absorbed instead of killing the process

use std::fmt;
use std::future::Future;

/// The signal that ended the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interrupt => write!(f, "SIGINT"),
            Self::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Install termination handlers and return a future resolving on the first signal.
#[cfg(unix)]
pub fn termination() -> std::io::Result<impl Future<Output = TerminationSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    Ok(async move {
        let received = tokio::select! {
            _ = interrupt.recv() => TerminationSignal::Interrupt,
            _ = terminate.recv() => TerminationSignal::Terminate,
        };
        tracing::info!(signal = %received, "Shutdown signal received");
        received
    })
}

/// Install termination handlers and return a future resolving on the first signal.
#[cfg(not(unix))]
pub fn termination() -> std::io::Result<impl Future<Output = TerminationSignal>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler failed");
        }
        tracing::info!(signal = %TerminationSignal::Interrupt, "Shutdown signal received");
        TerminationSignal::Interrupt
    })
}
