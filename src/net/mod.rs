//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Bind (listener.rs)
//!     → serve task accepts and hands connections to the router
//!     → connection.rs counts requests in flight
//!     → stop → drain within deadline → closed
//! ```

pub mod connection;
pub mod listener;
