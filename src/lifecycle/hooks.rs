//! Shutdown hook registry.
//!
//! Hooks are appended while the service is being assembled. When the listener
//! starts, the registry is sealed into a [`SealedHooks`] snapshot which has no
//! registration API and is consumed by the single run.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::observability::metrics;

/// Result returned by a shutdown hook.
pub type HookResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

type HookFn = Box<dyn FnOnce() -> HookResult + Send>;

struct Hook {
    name: String,
    run: HookFn,
}

/// Ordered, append-only list of cleanup actions.
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Vec<Hook>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook. Execution order equals registration order.
    pub fn register<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() -> HookResult + Send + 'static,
    {
        let name = name.into();
        tracing::debug!(hook = %name, position = self.hooks.len(), "Shutdown hook registered");
        self.hooks.push(Hook {
            name,
            run: Box::new(hook),
        });
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Hook names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name.as_str()).collect()
    }

    /// Close the registry for registration.
    pub fn seal(self) -> SealedHooks {
        SealedHooks { hooks: self.hooks }
    }
}

impl fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownHooks")
            .field("hooks", &self.names())
            .finish()
    }
}

/// Immutable snapshot of the registry, taken when the listener starts.
pub struct SealedHooks {
    hooks: Vec<Hook>,
}

impl SealedHooks {
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook sequentially in registration order.
    ///
    /// A hook that returns an error or panics is logged and recorded; the
    /// remaining hooks still run.
    pub fn run_all(self) -> HookReport {
        let mut report = HookReport::default();

        for Hook { name, run } in self.hooks {
            tracing::debug!(hook = %name, "Running shutdown hook");

            let reason = match panic::catch_unwind(AssertUnwindSafe(run)) {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(payload) => Some(format!("panicked: {}", panic_message(payload.as_ref()))),
            };

            if let Some(reason) = reason {
                tracing::error!(hook = %name, error = %reason, "Shutdown hook failed");
                metrics::record_hook_failure(&name);
                report.failures.push(HookFailure {
                    name: name.clone(),
                    reason,
                });
            }
            report.executed.push(name);
        }

        report
    }
}

impl fmt::Debug for SealedHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}

/// Extract a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Outcome of running the sealed hooks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    /// Every hook that was invoked, in order.
    pub executed: Vec<String>,
    pub failures: Vec<HookFailure>,
}

impl HookReport {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A hook that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub name: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>, label: &'static str) -> impl FnOnce() -> HookResult {
        let log = Arc::clone(log);
        move || {
            log.lock().unwrap().push(label);
            Ok(())
        }
    }

    #[test]
    fn runs_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = ShutdownHooks::new();
        hooks.register("first", recording(&log, "first"));
        hooks.register("second", recording(&log, "second"));
        hooks.register("third", recording(&log, "third"));
        assert_eq!(hooks.names(), vec!["first", "second", "third"]);

        let report = hooks.seal().run_all();
        assert!(report.all_succeeded());
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(report.executed, vec!["first", "second", "third"]);
    }

    #[test]
    fn failing_hook_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = ShutdownHooks::new();
        hooks.register("first", recording(&log, "first"));
        hooks.register("second", || Err("flush failed".into()));
        hooks.register("third", recording(&log, "third"));

        let report = hooks.seal().run_all();
        assert_eq!(*log.lock().unwrap(), vec!["first", "third"]);
        assert_eq!(report.executed.len(), 3);
        assert_eq!(
            report.failures,
            vec![HookFailure {
                name: "second".into(),
                reason: "flush failed".into()
            }]
        );
    }

    #[test]
    fn panicking_hook_is_isolated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = ShutdownHooks::new();
        hooks.register("boom", || panic!("exploded"));
        hooks.register("after", recording(&log, "after"));

        let report = hooks.seal().run_all();
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].reason, "panicked: exploded");
    }

    #[test]
    fn empty_registry_runs_nothing() {
        let report = ShutdownHooks::new().seal().run_all();
        assert!(report.executed.is_empty());
        assert!(report.all_succeeded());
    }
}
