//! Route table binding.
//!
//! # Responsibilities
//! - Register each configured (method, pattern, handler) triple
//! - Add the built-in liveness check
//! - Reject collisions and malformed patterns before the listener binds
//!
//! # Design Decisions
//! - Routes are bound in configuration order
//! - Same method + pattern twice is a configuration error, never an overwrite
//! - Patterns are checked up front, against the same matcher axum uses, so the
//!   router never panics at startup

use std::collections::HashSet;
use std::fmt;

use axum::handler::Handler;
use axum::http::Method;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use thiserror::Error;

use crate::http::health;

/// Errors raised while binding the route table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("route {method} {pattern} registered more than once")]
    Collision { method: Method, pattern: String },

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route pattern '{pattern}' overlaps '{existing}'")]
    Conflict { pattern: String, existing: String },

    #[error("unsupported method {method} for route {pattern}")]
    UnsupportedMethod { method: Method, pattern: String },
}

type Endpoint = Box<dyn FnOnce(MethodFilter) -> MethodRouter + Send>;

/// A single (method, pattern, handler) entry.
pub struct Route {
    method: Method,
    pattern: String,
    endpoint: Endpoint,
}

impl Route {
    /// Create a route for any axum handler.
    pub fn new<H, T>(method: Method, pattern: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self {
            method,
            pattern: pattern.into(),
            endpoint: Box::new(move |filter| on(filter, handler)),
        }
    }

    pub fn get<H, T>(pattern: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::new(Method::GET, pattern, handler)
    }

    pub fn post<H, T>(pattern: impl Into<String>, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        Self::new(Method::POST, pattern, handler)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Ordered route table supplied by configuration.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Bind the built-in health check and every configured route into a router.
    pub fn into_router(self) -> Result<Router, RouteError> {
        let mut routes = Vec::with_capacity(self.routes.len() + 1);
        routes.push(health::route());
        routes.extend(self.routes);

        let mut seen = HashSet::new();
        // Same matcher axum routes with; anything it rejects would panic in `Router::route`.
        let mut matcher = matchit::Router::new();
        // One method router per pattern, in first-seen order.
        let mut bound: Vec<(String, MethodRouter)> = Vec::new();

        for Route {
            method,
            pattern,
            endpoint,
        } in routes
        {
            validate_pattern(&pattern)?;

            if !seen.insert((method.clone(), pattern.clone())) {
                return Err(RouteError::Collision { method, pattern });
            }

            let filter = MethodFilter::try_from(method.clone()).map_err(|_| {
                RouteError::UnsupportedMethod {
                    method: method.clone(),
                    pattern: pattern.clone(),
                }
            })?;

            tracing::debug!(method = %method, pattern = %pattern, "Route bound");

            let method_router = endpoint(filter);
            match bound.iter().position(|(p, _)| *p == pattern) {
                Some(index) => {
                    let (pattern, existing) = bound.remove(index);
                    bound.insert(index, (pattern, existing.merge(method_router)));
                }
                None => {
                    matcher
                        .insert(pattern.as_str(), ())
                        .map_err(|e| match e {
                            matchit::InsertError::Conflict { with } => RouteError::Conflict {
                                pattern: pattern.clone(),
                                existing: with,
                            },
                            other => RouteError::InvalidPattern {
                                pattern: pattern.clone(),
                                reason: other.to_string(),
                            },
                        })?;
                    bound.push((pattern, method_router));
                }
            }
        }

        Ok(bound
            .into_iter()
            .fold(Router::new(), |router, (pattern, method_router)| {
                router.route(&pattern, method_router)
            }))
    }
}

impl Extend<Route> for RouteTable {
    fn extend<I: IntoIterator<Item = Route>>(&mut self, iter: I) {
        self.routes.extend(iter);
    }
}

fn validate_pattern(pattern: &str) -> Result<(), RouteError> {
    let invalid = |reason: &str| RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    if !pattern.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    if pattern
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(invalid("use '{name}' or '{*name}' captures"));
    }
    Ok(())
}
