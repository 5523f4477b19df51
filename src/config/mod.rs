//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → optional TOML file (loader.rs)
//!     → environment overrides (loader.rs)
//!     → validation.rs (semantic checks)
//!     → ServiceSettings (validated, immutable)
//!     → ServiceConfig (settings + routes + hooks + extra middleware)
//!     → owned by the lifecycle orchestrator
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod service;
pub mod validation;

pub use loader::{load_settings, ConfigError};
pub use schema::{ListenerSettings, ObservabilitySettings, ServiceSettings, TracingSettings};
pub use service::ServiceConfig;
