//! Minimal HTTP service scaffold with a managed lifecycle.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::{ServiceConfig, ServiceSettings};
pub use error::{LifecycleError, StartupError};
pub use lifecycle::{Orchestrator, Shutdown, ShutdownReport};
