//! Configuration for the Herald runtime.
//!
//! Configuration is loaded once at process start through [`ConfigLoader`] and
//! handed to [`HeraldRuntime::from_config`](crate::HeraldRuntime::from_config)
//! explicitly; nothing in the runtime reads it from a global.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    HeraldConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, NotificationConfig,
    SpanEventConfig,
};
pub use validation::validate_config;
