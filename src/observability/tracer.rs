//! Request tracing.
//!
//! # Responsibilities
//! - Build the tracer from settings (sampler, span logging, service name)
//! - Provide the middleware that opens one span per sampled request
//! - Register the tracer's close as a shutdown hook
//!
//! # Design Decisions
//! - Disabled tracing contributes nothing: no middleware, no hook
//! - Init failure is fatal; a half-configured tracer never serves traffic
//! - Trace context is carried in `x-trace-id`, reused when the caller sends one

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use thiserror::Error;
use tracing::Instrument;

use crate::config::TracingSettings;
use crate::http::middleware::Middleware;
use crate::lifecycle::hooks::ShutdownHooks;

pub const TRACE_HEADER: &str = "x-trace-id";

/// Name of the tracing step in the middleware chain.
pub const MIDDLEWARE_NAME: &str = "tracing";

/// Name of the shutdown hook closing the tracer.
pub const CLOSE_HOOK_NAME: &str = "tracer-close";

/// Errors raised by the tracer.
#[derive(Debug, Error, PartialEq)]
pub enum TracerError {
    #[error("service name must not be empty")]
    EmptyServiceName,

    #[error("sampling ratio {0} is outside [0, 1]")]
    InvalidSamplingRatio(f64),

    #[error("tracer already closed")]
    AlreadyClosed,
}

/// Tracer construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TracerConfig {
    pub service_name: String,
    /// 1.0 samples every request.
    pub sampling_ratio: f64,
    /// Log each finished span synchronously.
    pub log_spans: bool,
}

impl From<&TracingSettings> for TracerConfig {
    fn from(settings: &TracingSettings) -> Self {
        Self {
            service_name: settings.service_name.clone(),
            sampling_ratio: settings.sampling_ratio,
            log_spans: settings.log_spans,
        }
    }
}

#[derive(Debug)]
struct TracerInner {
    config: TracerConfig,
    finished_spans: AtomicU64,
    close_calls: AtomicU64,
    closed: AtomicBool,
}

/// Handle to the tracing client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

impl Tracer {
    pub fn init(config: TracerConfig) -> Result<Self, TracerError> {
        if config.service_name.trim().is_empty() {
            return Err(TracerError::EmptyServiceName);
        }
        if !(0.0..=1.0).contains(&config.sampling_ratio) {
            return Err(TracerError::InvalidSamplingRatio(config.sampling_ratio));
        }

        tracing::info!(
            service = %config.service_name,
            sampling_ratio = config.sampling_ratio,
            log_spans = config.log_spans,
            "Tracer initialized"
        );

        Ok(Self {
            inner: Arc::new(TracerInner {
                config,
                finished_spans: AtomicU64::new(0),
                close_calls: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn service_name(&self) -> &str {
        &self.inner.config.service_name
    }

    pub fn finished_spans(&self) -> u64 {
        self.inner.finished_spans.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> u64 {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Flush and close. Only the first call succeeds.
    pub fn close(&self) -> Result<(), TracerError> {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Err(TracerError::AlreadyClosed);
        }
        tracing::info!(
            service = %self.service_name(),
            finished_spans = self.finished_spans(),
            "Tracer closed"
        );
        Ok(())
    }

    fn should_sample(&self) -> bool {
        let ratio = self.inner.config.sampling_ratio;
        !self.is_closed() && (ratio >= 1.0 || fastrand::f64() < ratio)
    }

    /// Middleware opening a span around the rest of the chain.
    pub fn middleware(&self) -> Middleware {
        let tracer = self.clone();
        Middleware::from_fn(MIDDLEWARE_NAME, move |request: Request, next: Next| {
            let tracer = tracer.clone();
            async move {
                if !tracer.should_sample() {
                    return next.run(request).await;
                }

                let trace_id = request
                    .headers()
                    .get(TRACE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

                let span = tracing::info_span!(
                    "http.request",
                    service = %tracer.service_name(),
                    trace_id = %trace_id,
                    http.method = %request.method(),
                    http.path = %request.uri().path(),
                    http.status_code = tracing::field::Empty,
                );

                let start = Instant::now();
                let mut response = next.run(request).instrument(span.clone()).await;
                let status = response.status().as_u16();
                span.record("http.status_code", status);

                if let Ok(value) = HeaderValue::from_str(&trace_id) {
                    response.headers_mut().insert(TRACE_HEADER, value);
                }

                tracer.inner.finished_spans.fetch_add(1, Ordering::SeqCst);
                if tracer.inner.config.log_spans {
                    tracing::info!(
                        parent: &span,
                        status,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Span finished"
                    );
                }

                response
            }
        })
    }
}

/// Initialize the tracer when enabled; register its middleware and close hook.
///
/// Disabled tracing returns `Ok(None)` and touches neither list.
pub fn install(
    settings: &TracingSettings,
    hooks: &mut ShutdownHooks,
    middleware: &mut Vec<Middleware>,
) -> Result<Option<Tracer>, TracerError> {
    if !settings.enabled {
        tracing::debug!("Tracing disabled");
        return Ok(None);
    }

    let tracer = Tracer::init(TracerConfig::from(settings))?;

    let closing = tracer.clone();
    hooks.register(CLOSE_HOOK_NAME, move || closing.close().map_err(Into::into));
    middleware.push(tracer.middleware());

    Ok(Some(tracer))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> TracingSettings {
        TracingSettings {
            enabled: true,
            ..TracingSettings::default()
        }
    }

    #[test]
    fn disabled_contributes_nothing() {
        let mut hooks = ShutdownHooks::new();
        let mut middleware = Vec::new();

        let tracer = install(&TracingSettings::default(), &mut hooks, &mut middleware).unwrap();
        assert!(tracer.is_none());
        assert!(hooks.is_empty());
        assert!(middleware.is_empty());
    }

    #[test]
    fn enabled_registers_one_hook_and_one_middleware() {
        let mut hooks = ShutdownHooks::new();
        let mut middleware = Vec::new();

        let tracer = install(&enabled(), &mut hooks, &mut middleware)
            .unwrap()
            .expect("tracer");
        assert_eq!(hooks.names(), vec![CLOSE_HOOK_NAME]);
        assert_eq!(middleware.len(), 1);
        assert_eq!(middleware[0].name(), MIDDLEWARE_NAME);

        let report = hooks.seal().run_all();
        assert!(report.all_succeeded());
        assert!(tracer.is_closed());
        assert_eq!(tracer.close_calls(), 1);
    }

    #[test]
    fn init_failure_is_reported() {
        let mut hooks = ShutdownHooks::new();
        let mut middleware = Vec::new();
        let settings = TracingSettings {
            sampling_ratio: 1.5,
            ..enabled()
        };

        let err = install(&settings, &mut hooks, &mut middleware).unwrap_err();
        assert_eq!(err, TracerError::InvalidSamplingRatio(1.5));
        assert!(hooks.is_empty());
        assert!(middleware.is_empty());

        let settings = TracingSettings {
            service_name: " ".into(),
            ..enabled()
        };
        assert_eq!(
            install(&settings, &mut hooks, &mut middleware).unwrap_err(),
            TracerError::EmptyServiceName
        );
    }

    #[test]
    fn second_close_is_detected() {
        let tracer = Tracer::init(TracerConfig::from(&enabled())).unwrap();
        assert!(tracer.close().is_ok());
        assert_eq!(tracer.close(), Err(TracerError::AlreadyClosed));
        assert_eq!(tracer.close_calls(), 2);
    }
}
