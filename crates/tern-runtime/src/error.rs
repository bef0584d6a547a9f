//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use tern_framework::ModuleError;

/// Errors that can occur while building or running the runtime.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A module could not be registered.
    #[error("Module registration failed: {0}")]
    Module(#[from] ModuleError),

    /// The event loop is already running.
    #[error("Runtime is already running")]
    AlreadyRunning,

    /// The event loop has already run and shut down.
    #[error("Runtime has been stopped and cannot run again")]
    Stopped,

    /// A shutdown signal handler could not be installed.
    #[error("Failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
