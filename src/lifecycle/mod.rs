//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (orchestrator.rs):
//!     Validate settings → Init tracer → Compose middleware → Bind → Serve
//!
//! Shutdown (orchestrator.rs, shutdown.rs):
//!     Signal received → Run hooks (hooks.rs) → Stop accepting → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Hooks are sealed when the listener starts; late registration is impossible
//! - Every hook runs before the drain, even when an earlier one fails
//! - Drain has a fixed deadline: forced exit is reported, never hidden

pub mod hooks;
pub mod orchestrator;
pub mod shutdown;
pub mod signals;

pub use hooks::{HookFailure, HookReport, HookResult, SealedHooks, ShutdownHooks};
pub use orchestrator::{LifecycleState, Orchestrator, RunningService};
pub use shutdown::{DrainOutcome, Shutdown, ShutdownReport, GRACE_DEADLINE};
