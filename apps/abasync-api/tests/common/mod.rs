//! Test harness: the router wired to wiremock stand-ins for Abacus and
//! Pipedrive, with mappings stored in a temporary directory.

#![allow(dead_code)]

use abasync_abacus::ReportManager;
use abasync_api::{build_router, AppState, CooldownLimiter};
use abasync_core::{AbacusConfig, JobState, ReportHandle, ReportRegistry, TenantCatalog};
use abasync_pipedrive::{MappingStore, PipedriveClient};
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const MANDANT: &str = "19";
pub const PIPEDRIVE_TOKEN: &str = "pd-test-token";

pub struct TestApp {
    pub abacus: MockServer,
    pub pipedrive: MockServer,
    pub state: AppState,
    _mappings_dir: TempDir,
}

impl TestApp {
    /// App with a configured CRM key.
    pub async fn new() -> Self {
        Self::build(true, Duration::from_secs(300)).await
    }

    pub async fn without_crm() -> Self {
        Self::build(false, Duration::from_secs(300)).await
    }

    pub async fn build(with_crm: bool, cooldown: Duration) -> Self {
        let abacus = MockServer::start().await;
        let pipedrive = MockServer::start().await;
        let mappings_dir = TempDir::new().unwrap();

        let config = AbacusConfig::new(abacus.uri(), "client", "secret")
            .with_page_size(100)
            .with_poll_interval(Duration::from_millis(10))
            .with_request_timeout(Duration::from_secs(5))
            .with_auth_retry(0, Duration::from_millis(1));
        let tenant = TenantCatalog::builtin().tenant("uniska").unwrap().clone();
        let manager =
            ReportManager::new(Arc::new(config), Arc::new(tenant), ReportRegistry::new()).unwrap();

        let mappings = Arc::new(MappingStore::open(mappings_dir.path(), "uniska").unwrap());
        let crm = with_crm.then(|| {
            PipedriveClient::new(pipedrive.uri(), PIPEDRIVE_TOKEN, Duration::from_secs(5)).unwrap()
        });

        let state = AppState::new(manager, CooldownLimiter::new(cooldown), mappings, crm);

        Mock::given(method("POST"))
            .and(path("/oauth/oauth2/v1/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"access_token": "test-token"})),
            )
            .mount(&abacus)
            .await;

        Self {
            abacus,
            pipedrive,
            state,
            _mappings_dir: mappings_dir,
        }
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn send_json(&self, method: &str, uri: &str, body: Value) -> Response<Body> {
        self.send_json_as(method, uri, body, None).await
    }

    pub async fn send_json_as(
        &self,
        method: &str,
        uri: &str,
        body: Value,
        user: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        self.router()
            .oneshot(builder.body(Body::from(body.to_string())).unwrap())
            .await
            .unwrap()
    }

    pub async fn delete(&self, uri: &str) -> Response<Body> {
        self.router()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Report `kind` submitted as job `job-<kind>`, finished with `rows` in one page.
    pub async fn mock_finished_report(&self, kind: &str, rows: Value) {
        let job_id = format!("job-{kind}");
        let count = rows.as_array().map_or(0, Vec::len);
        self.mock_submit(kind).await;

        Mock::given(method("GET"))
            .and(path(format!("/api/abareport/v1/jobs/{job_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "FinishedSuccess",
                "message": format!("Rows={count}")
            })))
            .mount(&self.abacus)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/api/abareport/v1/jobs/{job_id}/output/1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(rows))
            .mount(&self.abacus)
            .await;
    }

    /// Report `kind` that never leaves the running state.
    pub async fn mock_running_report(&self, kind: &str) {
        self.mock_submit(kind).await;
        Mock::given(method("GET"))
            .and(path(format!("/api/abareport/v1/jobs/job-{kind}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "Running",
                "message": "Generating"
            })))
            .mount(&self.abacus)
            .await;
    }

    async fn mock_submit(&self, kind: &str) {
        Mock::given(method("POST"))
            .and(path(format!(
                "/api/abareport/v1/report/{MANDANT}/uniska_pipedrive_{kind}"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": format!("job-{kind}")})))
            .mount(&self.abacus)
            .await;
    }

    /// Every Pipedrive search finds nothing and every create returns `id`.
    pub async fn mock_pipedrive_creates(&self, id: u64) {
        Mock::given(method("GET"))
            .and(path_regex(r"^/[a-z]+/search$"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "data": {"items": []}})),
            )
            .mount(&self.pipedrive)
            .await;
        Mock::given(method("POST"))
            .and(path_regex(r"^/(organizations|persons|deals)$"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"success": true, "data": {"id": id}})),
            )
            .mount(&self.pipedrive)
            .await;
    }

    /// Waits until every report in the registry is terminal.
    pub async fn wait_until_finished(&self, handle: &ReportHandle) -> JobState {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let record = self.state.manager.get_status(handle).await.unwrap();
                if record.state.is_terminal() {
                    return record.state;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("report did not finish in time")
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn content_type(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

pub fn address_rows() -> Value {
    json!([
        {"NR": 100, "NAME": "Muster AG", "ORT": "Basel", "TEL": "", "TEL2": "061 111 11 11"},
        {"NR": 200, "NAME": "Beispiel GmbH", "ORT": "Bern", "TEL": "031 222 22 22"}
    ])
}

pub fn contact_rows() -> Value {
    json!([
        {"ADR_NR": 100, "VORNAME": "Anna", "NAME": "Meier", "TEL": "", "NATEL": "079 333 33 33"}
    ])
}

pub fn project_rows() -> Value {
    json!([
        {"ProjNr": "P-1", "ProjName": "Umbau Empfang", "AdrNrIntern": 100, "DebNr": 0},
        {"ProjNr": "P-2", "ProjName": "Neubau Lager", "AdrNrIntern": "0", "DebNr": "200"},
        {"ProjNr": "P-3", "ProjName": "Ohne Adresse", "AdrNrIntern": 999}
    ])
}
