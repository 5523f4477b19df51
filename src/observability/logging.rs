//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level when set

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ServiceSettings;

/// Filter used when `RUST_LOG` is not set.
pub fn default_directives(level: &str) -> String {
    format!("service_scaffold={level},tower_http={level}", level = level.to_ascii_lowercase())
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init_logging(settings: &ServiceSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(&settings.observability.log_level).into());

    let registry = tracing_subscriber::registry().with(filter);

    if settings.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_crate_and_tower_http() {
        assert_eq!(
            default_directives("DEBUG"),
            "service_scaffold=debug,tower_http=debug"
        );
    }
}
