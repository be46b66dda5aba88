//! Mock Abacus server using wiremock for integration testing.
//!
//! Mounts the token, report-submission, job-status and job-output endpoints
//! with configurable responses.

#![allow(dead_code)]

use abasync_abacus::{AbacusClient, ReportManager};
use abasync_core::{
    AbacusConfig, JobState, ReportHandle, ReportJobRecord, ReportRegistry, TenantCatalog,
    TenantConfig,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{basic_auth, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "client";
pub const CLIENT_SECRET: &str = "secret";
pub const ACCESS_TOKEN: &str = "test-token";
pub const TOKEN_PATH: &str = "/oauth/oauth2/v1/token";
pub const PAGE_SIZE: u32 = 100;

pub struct MockAbacusServer {
    server: MockServer,
}

impl MockAbacusServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Configuration with short timings so tests finish quickly.
    pub fn config(&self) -> AbacusConfig {
        AbacusConfig::new(self.uri(), CLIENT_ID, CLIENT_SECRET)
            .with_page_size(PAGE_SIZE)
            .with_poll_interval(Duration::from_millis(10))
            .with_request_timeout(Duration::from_secs(5))
            .with_auth_retry(3, Duration::from_millis(1))
    }

    pub fn client(&self) -> AbacusClient {
        AbacusClient::new(Arc::new(self.config())).unwrap()
    }

    pub fn manager(&self, registry: ReportRegistry) -> ReportManager {
        self.manager_for(uniska(), registry)
    }

    pub fn manager_for(&self, tenant: TenantConfig, registry: ReportRegistry) -> ReportManager {
        ReportManager::with_client(self.client(), Arc::new(tenant), registry)
    }

    // =========================================================================
    // Token endpoint
    // =========================================================================

    pub async fn mock_token(&self) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(basic_auth(CLIENT_ID, CLIENT_SECRET))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ACCESS_TOKEN,
                "token_type": "Bearer",
                "expires_in": 600
            })))
            .mount(&self.server)
            .await;
    }

    // =========================================================================
    // Report endpoints
    // =========================================================================

    pub async fn mock_submit(&self, mandant: &str, report_name: &str, response: Value) {
        Mock::given(method("POST"))
            .and(path(format!(
                "/api/abareport/v1/report/{mandant}/{report_name}"
            )))
            .and(header("Authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(response))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_status(&self, job_id: &str, state: &str, message: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/abareport/v1/jobs/{job_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": state,
                "message": message
            })))
            .mount(&self.server)
            .await;
    }

    /// Status answered only once; later polls fall through to other mocks.
    pub async fn mock_status_once(&self, job_id: &str, state: &str, message: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/api/abareport/v1/jobs/{job_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": state,
                "message": message
            })))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_page(&self, job_id: &str, page: u32, body: Value, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/api/abareport/v1/jobs/{job_id}/output/{page}")))
            .and(header("Authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_page_status(&self, job_id: &str, page: u32, status: u16, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/api/abareport/v1/jobs/{job_id}/output/{page}")))
            .respond_with(ResponseTemplate::new(status))
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }
}

/// `count` address rows numbered from `start`.
pub fn address_rows(start: u64, count: u64) -> Value {
    Value::Array(
        (start..start + count)
            .map(|nr| json!({"NR": nr, "NAME": format!("Firma {nr}"), "TEL": ""}))
            .collect(),
    )
}

pub fn uniska() -> TenantConfig {
    TenantCatalog::builtin().tenant("uniska").unwrap().clone()
}

/// Waits until the poller moved the record to a terminal state.
pub async fn wait_for_terminal(registry: &ReportRegistry, handle: &ReportHandle) -> ReportJobRecord {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let record = registry.get_status(handle).await.unwrap();
            if record.state != JobState::Running {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("report did not reach a terminal state in time")
}
