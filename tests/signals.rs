//! Termination signal handling, sent to this test process.
//!
//! Kept in its own test binary: once the handlers are installed, SIGTERM no
//! longer kills the process.

#![cfg(unix)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use service_scaffold::config::ServiceConfig;
use service_scaffold::lifecycle::signals::{self, TerminationSignal};
use service_scaffold::lifecycle::Shutdown;

mod common;

async fn send_sigterm() {
    let status = tokio::process::Command::new("kill")
        .arg("-TERM")
        .arg(std::process::id().to_string())
        .status()
        .await
        .expect("kill not available");
    assert!(status.success());
}

#[tokio::test]
async fn test_repeated_sigterm_shuts_down_once() {
    let runs = Arc::new(AtomicU32::new(0));
    let counted = runs.clone();
    let config = ServiceConfig::new(common::local_settings()).shutdown_hook("count", move || {
        counted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    let shutdown = Shutdown::new();

    // Two independent waiters both forward to the same trigger, as two
    // signal sources racing during shutdown would.
    let mut forwarders = Vec::new();
    for _ in 0..2 {
        let termination = signals::termination().unwrap();
        let trigger = shutdown.clone();
        forwarders.push(tokio::spawn(async move {
            let received = termination.await;
            (received, trigger.trigger())
        }));
    }

    let running = common::start(config, Duration::from_secs(5)).await;
    let waiter = shutdown.clone();
    let service = tokio::spawn(async move { running.run_until(waiter.triggered()).await });

    send_sigterm().await;
    send_sigterm().await;

    let mut fired = 0;
    for forwarder in forwarders {
        let (received, first) = tokio::time::timeout(Duration::from_secs(5), forwarder)
            .await
            .expect("signal not delivered")
            .unwrap();
        assert_eq!(received, TerminationSignal::Terminate);
        fired += u32::from(first);
    }
    assert_eq!(fired, 1);

    let report = service.await.unwrap().unwrap();
    assert_eq!(report.hooks.executed, vec!["count"]);
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
