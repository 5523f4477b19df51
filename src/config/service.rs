//! The assembled service description handed to the orchestrator.

use crate::config::schema::ServiceSettings;
use crate::http::middleware::Middleware;
use crate::http::routes::{Route, RouteTable};
use crate::lifecycle::hooks::{HookResult, ShutdownHooks};

/// Everything the orchestrator needs to run the service.
///
/// Built once at startup and moved into the orchestrator, which owns it for
/// the rest of the process.
#[derive(Debug, Default)]
pub struct ServiceConfig {
    pub settings: ServiceSettings,
    pub routes: RouteTable,
    /// Extra middleware, applied in registration order.
    pub middleware: Vec<Middleware>,
    pub hooks: ShutdownHooks,
}

impl ServiceConfig {
    pub fn new(settings: ServiceSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middleware.push(middleware);
        self
    }

    pub fn shutdown_hook<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: FnOnce() -> HookResult + Send + 'static,
    {
        self.hooks.register(name, hook);
        self
    }
}
