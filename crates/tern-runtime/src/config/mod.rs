//! Configuration for the Tern runtime.
//!
//! Sources are layered with figment (see [`ConfigLoader`]), extracted into
//! [`TernConfig`], then checked by [`validate_config`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    DispatchConfig, LogFormat, LogLevel, LogOutput, LogRotation, LoggingConfig, ModulesConfig,
    SpanEventConfig, TernConfig,
};
pub use validation::validate_config;
