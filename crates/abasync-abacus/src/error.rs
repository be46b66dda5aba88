//! Error types for the Abacus reporting client.

use abasync_core::RegistryError;
use thiserror::Error;

/// Result type alias using `AbacusError`.
pub type AbacusResult<T> = Result<T, AbacusError>;

/// Errors raised while talking to the Abacus reporting API.
#[derive(Debug, Error)]
pub enum AbacusError {
    /// The token endpoint kept failing until the retries were exhausted.
    #[error("authentication failed after {attempts} attempt(s): {message}")]
    AuthenticationFailed { attempts: u32, message: String },

    /// The ERP accepted the submission but returned no job id.
    #[error("API did not return a report ID")]
    MissingJobId,

    /// Transport or parse failure during a status check.
    #[error("status check failed: {0}")]
    PollTickFailed(String),

    /// Non-404 failure while retrieving a result page.
    #[error("failed to fetch page {page}: {message}")]
    FetchFailed { page: u32, message: String },

    #[error("unknown report kind: {0}")]
    UnknownReportKind(String),

    #[error("unknown mandant: {0}")]
    UnknownMandant(String),

    /// The ERP answered with a non-success status.
    #[error("Abacus API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl AbacusError {
    /// True for errors caused by the request itself rather than the ERP.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::UnknownReportKind(_) | Self::UnknownMandant(_))
    }
}
