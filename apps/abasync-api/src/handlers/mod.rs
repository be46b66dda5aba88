//! HTTP handlers.

pub mod combined;
pub mod pipedrive;
pub mod reports;

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

/// GET /
pub async fn index() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "message": "API is running",
        "endpoints": {
            "POST /startAllReports": "Start all reports for a mandant",
            "POST /startReport": "Start a single report",
            "GET /reports": "Get all report statuses",
            "GET /reportStatus/:id": "Get the status of a report",
            "GET /reportData/:id": "Get specific report data",
            "GET /reportData/:id/csv": "Download report data as CSV",
            "GET /combinedData": "Get combined report data",
            "GET /combinedData/csv": "Download combined data as CSV",
            "GET /pipedrive/mappings": "Get Pipedrive field mappings",
            "POST /pipedrive/sync": "Push new combined records to Pipedrive"
        }
    }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// CSV body served as a download.
fn csv_attachment(filename: &str, body: Vec<u8>) -> impl IntoResponse {
    let safe_name: String = filename
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
        .collect();

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{safe_name}\""),
            ),
        ],
        body,
    )
}
