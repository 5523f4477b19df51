//! HTTP surface of the service.
//!
//! # Data Flow
//! ```text
//! Accepted connection
//!     → middleware/ (recovery → caller middleware → access log)
//!     → routes.rs (method + pattern dispatch)
//!     → handler (health.rs, person.rs, caller routes)
//! ```

pub mod health;
pub mod middleware;
pub mod person;
pub mod routes;

pub use middleware::{Middleware, MiddlewareChain};
pub use routes::{Route, RouteError, RouteTable};
