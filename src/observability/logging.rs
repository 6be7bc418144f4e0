//! Structured logging.
//!
//! The subscriber honours `RUST_LOG` when set. Otherwise the configured level
//! applies to this crate and `tower_http`, while `sqlx` stays at `warn` unless
//! the level is `debug`.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Environment, LogLevel};

/// Default filter directives for a configured level.
pub fn filter_directives(level: LogLevel) -> String {
    let sqlx = if level == LogLevel::Debug { "debug" } else { "warn" };
    format!("healthlog_service={level},tower_http={level},sqlx={sqlx}")
}

/// Install the global subscriber.
pub fn init(level: LogLevel, environment: Environment) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(level)));
    let registry = tracing_subscriber::registry().with(filter);

    if environment == Environment::Production {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer()).try_init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        assert_eq!(
            filter_directives(LogLevel::Info),
            "healthlog_service=info,tower_http=info,sqlx=warn"
        );
        assert_eq!(
            filter_directives(LogLevel::Debug),
            "healthlog_service=debug,tower_http=debug,sqlx=debug"
        );
    }

    #[test]
    fn test_directives_parse() {
        for level in [LogLevel::Error, LogLevel::Warn, LogLevel::Info, LogLevel::Debug] {
            assert!(EnvFilter::try_new(filter_directives(level)).is_ok());
        }
    }
}
