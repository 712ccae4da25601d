//! Runtime error types.

use dispatcher::{ActionError, DispatchError, RegistrationError};
use state_store::StoreError;
use thiserror::Error;

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("Unknown log format {0:?} (expected \"pretty\" or \"json\")")]
    UnknownLogFormat(String),
}

/// Errors raised while wiring or driving the application.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    #[error("State store error: {0}")]
    Store(#[from] StoreError),

    #[error("Action error: {0}")]
    Action(#[from] ActionError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}
