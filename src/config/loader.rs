//! Settings loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceSettings;
use crate::config::validation::{validate_settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load settings: defaults, then the optional TOML file, then environment overrides.
pub fn load_settings(path: Option<&Path>) -> Result<ServiceSettings, ConfigError> {
    let settings = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceSettings::default(),
    };

    resolve(settings, |key| std::env::var(key).ok())
}

/// Apply environment overrides through `lookup` and validate the result.
pub fn resolve<F>(mut settings: ServiceSettings, lookup: F) -> Result<ServiceSettings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        settings.listener.port = port;
    }
    if let Some(host) = lookup("HOST") {
        settings.listener.host = host;
    }
    if let Some(environment) = lookup("ENV") {
        settings.environment = environment;
    }
    if let Some(level) = lookup("LOG_LEVEL") {
        settings.observability.log_level = level;
    }
    // Only the literal "true" enables a feature flag.
    if let Some(flag) = lookup("TRACING_ENABLED") {
        settings.tracing.enabled = flag == "true";
    }
    if let Some(flag) = lookup("METRICS_ENABLED") {
        settings.observability.metrics_enabled = flag == "true";
    }

    validate_settings(&settings).map_err(ConfigError::Validation)?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let settings = resolve(ServiceSettings::default(), env(&[])).unwrap();
        assert_eq!(settings.listener.address(), "0.0.0.0:3000");
        assert_eq!(settings.environment, "development");
        assert!(!settings.tracing.enabled);
    }

    #[test]
    fn environment_overrides_file_values() {
        let settings = resolve(
            ServiceSettings::default(),
            env(&[("PORT", "8081"), ("ENV", "production"), ("TRACING_ENABLED", "true")]),
        )
        .unwrap();

        assert_eq!(settings.listener.port, "8081");
        assert!(settings.is_production());
        assert!(settings.tracing.enabled);
    }

    #[test]
    fn only_literal_true_enables_tracing() {
        let settings =
            resolve(ServiceSettings::default(), env(&[("TRACING_ENABLED", "TRUE")])).unwrap();
        assert!(!settings.tracing.enabled);

        let settings =
            resolve(ServiceSettings::default(), env(&[("TRACING_ENABLED", "1")])).unwrap();
        assert!(!settings.tracing.enabled);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = resolve(ServiceSettings::default(), env(&[("PORT", "http")])).unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "listener.port"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_settings(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
