//! Error types for configuration loading and registry writes.

use thiserror::Error;

use crate::{JobState, ReportHandle};

/// Result type alias using `ConfigError`.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type alias using `RegistryError`.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("failed to load tenant file {path}: {message}")]
    TenantFile { path: String, message: String },

    #[error("unknown company: {0}")]
    UnknownTenant(String),
}

/// Errors raised by registry writes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No record exists for the handle.
    #[error("unknown report handle: {0}")]
    UnknownHandle(ReportHandle),

    /// The record already reached a terminal state and is immutable.
    #[error("report {handle} already finished with state {state}")]
    AlreadyTerminal { handle: ReportHandle, state: JobState },
}
