//! Report job handlers.
//!
//! - POST /startAllReports: start every report of the company
//! - POST /startReport: start one report
//! - GET /reports: list report summaries
//! - GET /reportStatus/:id: full record
//! - GET /reportData/:id: dataset of a finished report
//! - GET /reportData/:id/csv: dataset as CSV

use abasync_core::{JobState, ReportDataSet, ReportHandle, ReportJobRecord};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use crate::error::{ApiError, ApiResult};
use crate::handlers::csv_attachment;
use crate::models::{
    year_param, ReportDataResponse, ReportListResponse, StartAllReportsRequest,
    StartAllReportsResponse, StartReportRequest, StartReportResponse,
};
use crate::rate_limit::client_id;
use crate::state::AppState;

/// Cooldown action key of a batch start.
const ALL_REPORTS_ACTION: &str = "all_reports";

/// POST /startAllReports
///
/// Starts the company's report kinds in sorted order and stops at the first
/// failure; reports started before it keep running.
pub async fn start_all_reports(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<StartAllReportsRequest>,
) -> ApiResult<Json<StartAllReportsResponse>> {
    let tenant = state.manager.tenant();
    if tenant.mandant_label(&request.mandant).is_none() {
        return Err(ApiError::BadRequest(format!(
            "Invalid mandant: {}",
            request.mandant
        )));
    }

    state
        .cooldown
        .check(&client_id(&headers), ALL_REPORTS_ACTION)
        .map_err(|retry_after_secs| ApiError::RateLimited { retry_after_secs })?;

    let year = year_param(request.year.as_ref());
    let mut report_ids = BTreeMap::new();
    for report_kind in tenant.report_kinds() {
        let handle = state
            .manager
            .start_report(&request.mandant, report_kind, &year)
            .await
            .map_err(|e| {
                error!(report_kind, error = %e, "Error starting report");
                ApiError::StartFailed {
                    report_kind: report_kind.to_string(),
                    message: e.to_string(),
                }
            })?;
        report_ids.insert(report_kind.to_string(), handle);
    }

    info!(mandant = %request.mandant, %year, count = report_ids.len(), "All reports started");
    Ok(Json(StartAllReportsResponse { report_ids }))
}

/// POST /startReport
pub async fn start_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<StartReportRequest>,
) -> ApiResult<Json<StartReportResponse>> {
    state
        .cooldown
        .check(&client_id(&headers), &request.report_key)
        .map_err(|retry_after_secs| ApiError::RateLimited { retry_after_secs })?;

    let year = year_param(request.year.as_ref());
    let report_id = state
        .manager
        .start_report(&request.mandant, &request.report_key, &year)
        .await?;

    Ok(Json(StartReportResponse { report_id }))
}

/// GET /reports
pub async fn list_reports(State(state): State<AppState>) -> Json<ReportListResponse> {
    Json(ReportListResponse {
        reports: state.manager.list_all().await,
    })
}

/// GET /reportStatus/:id
pub async fn report_status(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> ApiResult<Json<ReportJobRecord>> {
    let handle = parse_handle(&report_id)?;
    let record = state
        .manager
        .get_status(&handle)
        .await
        .ok_or_else(|| report_not_found(&report_id))?;
    Ok(Json(record))
}

/// GET /reportData/:id
pub async fn report_data(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> ApiResult<Response> {
    let (_, data) = finished_data(&state, &report_id).await?;
    Ok(Json(ReportDataResponse {
        report_data: data.as_slice(),
    })
    .into_response())
}

/// GET /reportData/:id/csv
pub async fn report_data_csv(
    State(state): State<AppState>,
    Path(report_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let (record, data) = finished_data(&state, &report_id).await?;
    let body = abasync_reconcile::records_to_csv(&data)?;
    let filename = format!("{}_{}.csv", record.report_kind, record.handle);
    Ok(csv_attachment(&filename, body))
}

/// Record and dataset of a `FinishedSuccess` report.
async fn finished_data(
    state: &AppState,
    report_id: &str,
) -> ApiResult<(ReportJobRecord, Arc<ReportDataSet>)> {
    let handle = parse_handle(report_id)?;
    let record = state
        .manager
        .get_status(&handle)
        .await
        .ok_or_else(|| report_not_found(report_id))?;

    if record.state != JobState::FinishedSuccess {
        return Err(ApiError::ReportNotReady(record.state));
    }

    let data = state
        .manager
        .get_data(&handle)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Report data not found: {report_id}")))?;
    Ok((record, data))
}

/// Malformed ids cannot name a report, so they are reported as unknown.
fn parse_handle(report_id: &str) -> ApiResult<ReportHandle> {
    report_id
        .parse()
        .map_err(|_| report_not_found(report_id))
}

fn report_not_found(report_id: &str) -> ApiError {
    ApiError::NotFound(format!("Report not found: {report_id}"))
}
