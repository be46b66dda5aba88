//! Error types for the Pipedrive client, mapping store and sync.

use abasync_core::EntityKind;
use thiserror::Error;

/// Result type alias using `PipedriveError`.
pub type PipedriveResult<T> = Result<T, PipedriveError>;

#[derive(Debug, Error)]
pub enum PipedriveError {
    /// Non-2xx response, or a 2xx response with `success: false`.
    #[error("Pipedrive API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected Pipedrive response: {0}")]
    UnexpectedResponse(String),

    /// A mapping for this source field already exists on the entity.
    #[error("field {source_field} is already mapped for {entity}")]
    DuplicateMapping {
        source_field: String,
        entity: EntityKind,
    },

    #[error("mapping {0} not found")]
    MappingNotFound(usize),

    /// The record lacks a value the CRM requires.
    #[error("record has no value for {0}")]
    MissingField(String),

    #[error("storage error at {path}: {message}")]
    Storage { path: String, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
