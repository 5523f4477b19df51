//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (port fits in u16, known log level)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceSettings → Result<(), Vec<ValidationError>>
//! - Runs before settings are accepted into the system

use std::fmt;

use crate::config::schema::ServiceSettings;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with the settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate resolved settings, collecting every problem found.
pub fn validate_settings(settings: &ServiceSettings) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if settings.listener.host.trim().is_empty() {
        errors.push(ValidationError::new("listener.host", "must not be empty"));
    }

    if settings.listener.port.parse::<u16>().is_err() {
        errors.push(ValidationError::new(
            "listener.port",
            format!("'{}' is not a valid port", settings.listener.port),
        ));
    }

    if settings.environment.trim().is_empty() {
        errors.push(ValidationError::new("environment", "must not be empty"));
    }

    let level = settings.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!(
                "'{}' is not one of {}",
                settings.observability.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        assert!(validate_settings(&ServiceSettings::default()).is_ok());
    }

    #[test]
    fn ephemeral_port_is_valid() {
        let mut settings = ServiceSettings::default();
        settings.listener.port = "0".into();
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn reports_every_problem() {
        let mut settings = ServiceSettings::default();
        settings.listener.port = "70000".into();
        settings.environment = "  ".into();
        settings.observability.log_level = "loud".into();

        let errors = validate_settings(&settings).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["listener.port", "environment", "observability.log_level"]
        );
    }
}
