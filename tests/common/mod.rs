//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use service_scaffold::config::{ServiceConfig, ServiceSettings};
use service_scaffold::lifecycle::{Orchestrator, RunningService};

/// Settings bound to an ephemeral loopback port.
pub fn local_settings() -> ServiceSettings {
    let mut settings = ServiceSettings::default();
    settings.listener.host = "127.0.0.1".into();
    settings.listener.port = "0".into();
    settings
}

/// Same as [`local_settings`] with tracing switched on.
pub fn traced_settings() -> ServiceSettings {
    let mut settings = local_settings();
    settings.tracing.enabled = true;
    settings
}

/// Start `config` and return once the listener accepts connections.
pub async fn start(config: ServiceConfig, grace: Duration) -> RunningService {
    let mut orchestrator = Orchestrator::new(config).with_grace_deadline(grace);
    orchestrator.start().await.expect("service failed to start")
}

/// Client that bypasses any system proxy and never reuses connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{}{}", addr, path)
}
