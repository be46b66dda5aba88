//! Abacus reporting API client (reqwest-based).
//!
//! Wraps the three reporting endpoints: report submission, job status and
//! paginated job output. Every call carries a fresh bearer token.

use abasync_core::{AbacusConfig, JobState, ReportDefinition, ReportRow};
use regex::Regex;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, LazyLock};
use tracing::{debug, instrument, warn};

use crate::auth::TokenClient;
use crate::error::{AbacusError, AbacusResult};

const REPORT_PATH: &str = "/api/abareport/v1/report";
const JOBS_PATH: &str = "/api/abareport/v1/jobs";

/// Row count embedded in a job status message, e.g. `"Finished, rows=1500"`.
static ROWS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)rows=(\d+)").expect("ROWS_REGEX is a valid regex pattern")
});

/// Parsed body of the job-status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl JobStatus {
    #[must_use]
    pub fn job_state(&self) -> JobState {
        JobState::from_remote(self.state.as_deref().unwrap_or_default())
    }

    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    /// Row count announced in the message, if any.
    #[must_use]
    pub fn row_count(&self) -> Option<u64> {
        ROWS_REGEX
            .captures(self.message())
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Pages needed for the announced row count. `None` when the message
    /// carries no row count.
    #[must_use]
    pub fn total_pages(&self, page_size: u32) -> Option<u32> {
        let rows = self.row_count()?;
        let page_size = u64::from(page_size.max(1));
        let pages = rows.div_ceil(page_size);
        Some(u32::try_from(pages).unwrap_or(u32::MAX))
    }
}

/// Result of requesting one output page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    Rows(Vec<ReportRow>),
    /// 404: the job has no such page.
    NotFound,
    /// The body was empty or not a list.
    Empty,
}

/// HTTP client for the Abacus reporting API.
#[derive(Debug, Clone)]
pub struct AbacusClient {
    config: Arc<AbacusConfig>,
    auth: TokenClient,
    http_client: Client,
}

impl AbacusClient {
    /// Create a client whose requests time out after `request_timeout`.
    pub fn new(config: Arc<AbacusConfig>) -> AbacusResult<Self> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("abasync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AbacusError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(config: Arc<AbacusConfig>, http_client: Client) -> Self {
        let auth = TokenClient::new(Arc::clone(&config), http_client.clone());
        Self {
            config,
            auth,
            http_client,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AbacusConfig {
        &self.config
    }

    pub async fn authenticate(&self) -> AbacusResult<String> {
        self.auth.authenticate().await
    }

    /// Submits a report job and returns the ERP's job id.
    #[instrument(skip(self, report), fields(report_name = %report.report_name))]
    pub async fn submit_report(
        &self,
        mandant_id: &str,
        report: &ReportDefinition,
        fiscal_year: Option<&str>,
    ) -> AbacusResult<String> {
        let token = self.authenticate().await?;
        let url = format!(
            "{}{REPORT_PATH}/{}/{}",
            self.config.base_url,
            pad_mandant(mandant_id),
            report.report_name
        );
        let body = build_report_body(self.config.page_size, report, fiscal_year);

        debug!(%url, "Submitting report job");
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;

        let payload: Value = response.json().await?;
        extract_job_id(&payload).ok_or(AbacusError::MissingJobId)
    }

    /// Fetches the current status of a job.
    #[instrument(skip(self))]
    pub async fn job_status(&self, job_id: &str) -> AbacusResult<JobStatus> {
        let token = self.authenticate().await?;
        let url = format!("{}{JOBS_PATH}/{job_id}", self.config.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await?;
        let response = check_status(response).await?;

        Ok(response.json().await?)
    }

    /// Fetches one 1-indexed output page of a finished job.
    pub async fn fetch_page(
        &self,
        token: &str,
        job_id: &str,
        page: u32,
    ) -> AbacusResult<PageOutcome> {
        let url = format!("{}{JOBS_PATH}/{job_id}/output/{page}", self.config.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(PageOutcome::NotFound);
        }
        let response = check_status(response).await?;

        let body: Value = response.json().await?;
        let Value::Array(items) = body else {
            return Ok(PageOutcome::Empty);
        };
        if items.is_empty() {
            return Ok(PageOutcome::Empty);
        }

        let total = items.len();
        let rows: Vec<ReportRow> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect();
        if rows.len() < total {
            warn!(
                job_id,
                page,
                skipped = total - rows.len(),
                "Skipped non-object rows"
            );
        }

        Ok(PageOutcome::Rows(rows))
    }
}

/// Maps a non-success response onto [`AbacusError::Api`].
async fn check_status(response: Response) -> AbacusResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(AbacusError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Mandant ids are sent zero-padded to two digits (`"2"` becomes `"02"`).
#[must_use]
pub fn pad_mandant(mandant_id: &str) -> String {
    format!("{:0>2}", mandant_id.trim())
}

/// Normalizes the user-supplied year: empty and `"none"` mean no filter.
#[must_use]
pub fn fiscal_year(year: &str) -> Option<&str> {
    let year = year.trim();
    if year.is_empty() || year.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(year)
    }
}

/// Request body for a report submission.
#[must_use]
pub fn build_report_body(
    page_size: u32,
    report: &ReportDefinition,
    fiscal_year: Option<&str>,
) -> Value {
    let mut body = json!({
        "outputType": "json",
        "paging": page_size,
    });

    if let (true, Some(year)) = (report.year_filter, fiscal_year) {
        body["parameters"] = json!({
            "AUF_DATUM_VON": format!("{year}-01-01"),
            "AUF_DATUM_BIS": format!("{year}-12-31"),
        });
    }

    body
}

/// First non-empty of `id` and `reportId`, as a string.
fn extract_job_id(payload: &Value) -> Option<String> {
    ["id", "reportId"].iter().find_map(|key| match payload.get(*key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
