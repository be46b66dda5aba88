//! Report job types shared across the workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One row of a report: field name to scalar value, in the order the ERP
/// delivered the fields.
pub type ReportRow = serde_json::Map<String, serde_json::Value>;

/// All rows of a finished report, concatenated across pages.
pub type ReportDataSet = Vec<ReportRow>;

/// Field of a combined record carrying its CRM sync status.
pub const STATUS_FIELD: &str = "Status";
/// Status of a record not yet pushed to the CRM.
pub const STATUS_NEW: &str = "new";
pub const STATUS_SYNCED: &str = "synced";

/// True for null and whitespace-only strings.
#[must_use]
pub fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Opaque identifier issued locally for every accepted report request.
///
/// Never sent to the ERP; the ERP's own job id lives in
/// [`ReportJobRecord::remote_job_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportHandle(Uuid);

impl ReportHandle {
    /// Generates a fresh random handle.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReportHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ReportHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Lifecycle state of a report job.
///
/// `Running` is the only non-terminal state. The ERP reports a handful of
/// intermediate states (queued, pending, running); they all collapse into
/// `Running` here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobState {
    Running,
    FinishedSuccess,
    FinishedError,
}

impl JobState {
    /// Maps the ERP's `state` string onto a local state.
    #[must_use]
    pub fn from_remote(state: &str) -> Self {
        match state {
            "FinishedSuccess" => Self::FinishedSuccess,
            "FinishedError" => Self::FinishedError,
            _ => Self::Running,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::FinishedSuccess => "FinishedSuccess",
            Self::FinishedError => "FinishedError",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status record of one report request.
///
/// Serialized with the field names the dashboard and HTTP clients expect
/// (`report_id`, `report_key`, `status`, `message`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportJobRecord {
    #[serde(rename = "report_id")]
    pub handle: ReportHandle,
    #[serde(rename = "mandant")]
    pub mandant_id: String,
    #[serde(rename = "report_key")]
    pub report_kind: String,
    /// Job id assigned by the ERP once the submission was accepted.
    #[serde(rename = "api_report_id")]
    pub remote_job_id: Option<String>,
    #[serde(rename = "status")]
    pub state: JobState,
    #[serde(rename = "message")]
    pub status_message: String,
    pub total_pages: u32,
    pub created_at: DateTime<Utc>,
}

impl ReportJobRecord {
    /// Creates a fresh `Running` record with a provisional page count of 1.
    #[must_use]
    pub fn new(handle: ReportHandle, mandant_id: &str, report_kind: &str) -> Self {
        Self {
            handle,
            mandant_id: mandant_id.to_string(),
            report_kind: report_kind.to_string(),
            remote_job_id: None,
            state: JobState::Running,
            status_message: "Report started.".to_string(),
            total_pages: 1,
            created_at: Utc::now(),
        }
    }

    /// Applies a freshly computed page count. `None` keeps the current value.
    pub fn apply_total_pages(&mut self, total_pages: Option<u32>) {
        if let Some(pages) = total_pages {
            self.total_pages = pages;
        }
    }

    /// Condensed view used by the status dashboard.
    #[must_use]
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            handle: self.handle,
            report_kind: self.report_kind.clone(),
            state: self.state,
            status_message: self.status_message.clone(),
        }
    }
}

/// Dashboard row: handle, kind, state and message of one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    #[serde(rename = "report_id")]
    pub handle: ReportHandle,
    #[serde(rename = "report_key")]
    pub report_kind: String,
    #[serde(rename = "status")]
    pub state: JobState,
    #[serde(rename = "message")]
    pub status_message: String,
}
