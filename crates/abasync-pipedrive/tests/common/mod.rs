//! Mock Pipedrive server using wiremock.

#![allow(dead_code)]

use abasync_pipedrive::PipedriveClient;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const API_TOKEN: &str = "pd-test-token";

pub struct MockPipedrive {
    server: MockServer,
}

impl MockPipedrive {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    pub fn client(&self) -> PipedriveClient {
        PipedriveClient::with_http_client(self.server.uri(), API_TOKEN, reqwest::Client::new())
    }

    pub async fn mock_create(&self, entity_path: &str, id: u64, expected_calls: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/{entity_path}")))
            .and(query_param("api_token", API_TOKEN))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"success": true, "data": {"id": id}})),
            )
            .expect(expected_calls)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_search(&self, entity_path: &str, term: &str, found: Option<u64>) {
        let items: Value = match found {
            Some(id) => json!([{"result_score": 1.0, "item": {"id": id, "name": term}}]),
            None => json!([]),
        };
        Mock::given(method("GET"))
            .and(path(format!("/{entity_path}/search")))
            .and(query_param("term", term))
            .and(query_param("exact_match", "true"))
            .and(query_param("api_token", API_TOKEN))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "data": {"items": items}})),
            )
            .mount(&self.server)
            .await;
    }
}
