//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional TOML file ($HEALTHLOG_CONFIG)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (ENV, LOG_LEVEL, PORT, API_TOKEN, DATABASE_URL, ...)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults; only the API token is mandatory
//! - Illegal ENV/LOG_LEVEL/PORT values fall back to defaults with a warning

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, LoadedConfig};
pub use schema::{
    ApiConfig, Environment, ListenerConfig, LogLevel, ObservabilityConfig, SecurityConfig,
    ServiceConfig, StorageConfig, TimeoutConfig,
};
