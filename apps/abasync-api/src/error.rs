//! Error types for the HTTP API.
//!
//! Uses RFC 7807 Problem Details for every error response.

use abasync_abacus::AbacusError;
use abasync_core::{ConfigError, JobState};
use abasync_pipedrive::PipedriveError;
use abasync_reconcile::ExportError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Base URL for error type URIs.
const ERROR_BASE_URL: &str = "https://abasync.dev/errors";

/// RFC 7807 Problem Details structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    /// URI identifying the problem type.
    #[serde(rename = "type")]
    pub error_type: String,

    pub title: String,

    pub status: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ProblemDetails {
    #[must_use]
    pub fn new(error_type: &str, title: &str, status: StatusCode) -> Self {
        Self {
            error_type: format!("{ERROR_BASE_URL}/{error_type}"),
            title: title.to_string(),
            status: status.as_u16(),
            detail: None,
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The report exists but has no dataset yet.
    #[error("Report not ready: {0}")]
    ReportNotReady(JobState),

    /// A cooldown is still active for this client and report.
    #[error("Too many requests, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The CRM API key is not configured.
    #[error("Pipedrive integration is not configured")]
    CrmNotConfigured,

    /// One report of a batch start failed.
    #[error("Error starting report {report_kind}: {message}")]
    StartFailed {
        report_kind: String,
        message: String,
    },

    #[error(transparent)]
    Abacus(#[from] AbacusError),

    #[error(transparent)]
    Pipedrive(#[from] PipedriveError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Convert to `ProblemDetails`.
    pub fn to_problem_details(&self) -> ProblemDetails {
        let status = self.status_code();
        match self {
            ApiError::BadRequest(msg) => {
                ProblemDetails::new("bad-request", "Bad Request", status).with_detail(msg.clone())
            }

            ApiError::NotFound(msg) => {
                ProblemDetails::new("not-found", "Not Found", status).with_detail(msg.clone())
            }

            ApiError::ReportNotReady(state) => {
                ProblemDetails::new("report-not-ready", "Report Not Ready", status)
                    .with_detail(format!("Report data not available (status: {state})"))
            }

            ApiError::RateLimited { retry_after_secs } => {
                ProblemDetails::new("rate-limited", "Too Many Requests", status).with_detail(
                    format!("Please wait {retry_after_secs} seconds before starting this report again."),
                )
            }

            ApiError::CrmNotConfigured => {
                ProblemDetails::new("crm-not-configured", "CRM Not Configured", status)
                    .with_detail("No Pipedrive API key is configured for this company.")
            }

            ApiError::StartFailed { .. } => {
                tracing::error!(error = %self, "Report start failed");
                ProblemDetails::new("report-start-failed", "Report Start Failed", status)
                    .with_detail(self.to_string())
            }

            ApiError::Abacus(err) if err.is_client_error() => {
                ProblemDetails::new("invalid-report-request", "Invalid Report Request", status)
                    .with_detail(err.to_string())
            }

            ApiError::Abacus(err) => {
                tracing::error!(error = %err, "Abacus request failed");
                ProblemDetails::new("abacus-error", "Abacus Error", status)
                    .with_detail(err.to_string())
            }

            ApiError::Pipedrive(err) => match err {
                PipedriveError::DuplicateMapping { .. } => {
                    ProblemDetails::new("duplicate-mapping", "Duplicate Mapping", status)
                        .with_detail(err.to_string())
                }
                PipedriveError::MappingNotFound(_) => {
                    ProblemDetails::new("mapping-not-found", "Mapping Not Found", status)
                        .with_detail(err.to_string())
                }
                PipedriveError::Api { .. } | PipedriveError::Http(_) => {
                    tracing::warn!(error = %err, "Pipedrive request failed");
                    ProblemDetails::new("pipedrive-error", "Pipedrive Error", status)
                        .with_detail(err.to_string())
                }
                _ => {
                    tracing::error!(error = %err, "Internal Pipedrive error");
                    internal_problem()
                }
            },

            ApiError::Export(err) => {
                tracing::error!(error = %err, "CSV export failed");
                internal_problem()
            }

            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal API error");
                internal_problem()
            }
        }
    }

    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::ReportNotReady(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::CrmNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::StartFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Abacus(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Abacus(_) => StatusCode::BAD_GATEWAY,
            ApiError::Pipedrive(err) => match err {
                PipedriveError::DuplicateMapping { .. } => StatusCode::CONFLICT,
                PipedriveError::MappingNotFound(_) => StatusCode::NOT_FOUND,
                PipedriveError::Api { .. } | PipedriveError::Http(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Export(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn internal_problem() -> ProblemDetails {
    ProblemDetails::new(
        "internal-error",
        "Internal Server Error",
        StatusCode::INTERNAL_SERVER_ERROR,
    )
    .with_detail("An internal error occurred. Please try again later.")
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let problem = self.to_problem_details();

        let mut response = (status, Json(problem)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        if let ApiError::RateLimited { retry_after_secs } = self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
        }

        response
    }
}

/// Failures while assembling the application state.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Abacus client error: {0}")]
    Abacus(#[from] AbacusError),

    #[error("Pipedrive setup error: {0}")]
    Pipedrive(#[from] PipedriveError),
}
