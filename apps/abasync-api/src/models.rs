//! Request and response bodies of the HTTP API.

use abasync_core::{FieldMapping, ReportHandle, ReportRow, ReportSummary, SyncSettings};
use abasync_pipedrive::{CrmField, MappingsByEntity, RecordReport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Year value meaning "no fiscal year filter".
pub const NO_YEAR: &str = "none";

#[derive(Debug, Deserialize)]
pub struct StartAllReportsRequest {
    pub mandant: String,
    /// Fiscal year as a string or a number; absent means no filter.
    #[serde(default)]
    pub year: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct StartReportRequest {
    pub mandant: String,
    pub report_key: String,
    #[serde(default)]
    pub year: Option<Value>,
}

/// Normalizes the optional `year` field to the string form the ERP client expects.
#[must_use]
pub fn year_param(year: Option<&Value>) -> String {
    match year {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => NO_YEAR.to_string(),
    }
}

#[derive(Debug, Serialize)]
pub struct StartAllReportsResponse {
    pub report_ids: BTreeMap<String, ReportHandle>,
}

#[derive(Debug, Serialize)]
pub struct StartReportResponse {
    pub report_id: ReportHandle,
}

#[derive(Debug, Serialize)]
pub struct ReportListResponse {
    pub reports: Vec<ReportSummary>,
}

#[derive(Debug, Serialize)]
pub struct ReportDataResponse<'a> {
    pub report_data: &'a [ReportRow],
}

#[derive(Debug, Serialize)]
pub struct CombinedDataResponse {
    pub combined_data: Vec<ReportRow>,
}

#[derive(Debug, Serialize)]
pub struct MappingsResponse {
    pub mappings: MappingsByEntity,
    pub settings: SyncSettings,
}

#[derive(Debug, Serialize)]
pub struct MappingCreatedResponse {
    pub index: usize,
    pub mapping: FieldMapping,
}

#[derive(Debug, Serialize)]
pub struct MappingDeletedResponse {
    pub deleted: FieldMapping,
}

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub entity: String,
    pub fields: Vec<CrmField>,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub synced: usize,
    pub failed: usize,
    pub results: Vec<RecordReport>,
}
