//! Pipedrive REST client (reqwest-based).
//!
//! Every request carries the API token as the `api_token` query parameter.
//! Responses use the `{success, data}` envelope.

use abasync_core::EntityKind;
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::{PipedriveError, PipedriveResult};

pub const DEFAULT_API_URL: &str = "https://api.pipedrive.com/v1";

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    item: EntityRef,
}

#[derive(Debug, Clone, Deserialize)]
struct EntityRef {
    id: u64,
}

/// Field metadata of a CRM entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmField {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub mandatory_flag: Option<bool>,
}

#[derive(Clone)]
pub struct PipedriveClient {
    base_url: String,
    api_token: SecretString,
    http_client: Client,
}

impl std::fmt::Debug for PipedriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipedriveClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"[REDACTED]")
            .finish()
    }
}

impl PipedriveClient {
    pub fn new(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        timeout: Duration,
    ) -> PipedriveResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipedriveError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_http_client(base_url, api_token, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    #[must_use]
    pub fn with_http_client(
        base_url: impl Into<String>,
        api_token: impl Into<String>,
        http_client: Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_token: SecretString::from(api_token.into()),
            http_client,
        }
    }

    /// Creates an organization and returns its id.
    #[instrument(skip_all)]
    pub async fn create_organization(&self, payload: &Map<String, Value>) -> PipedriveResult<u64> {
        self.create("organizations", payload).await
    }

    #[instrument(skip_all)]
    pub async fn create_person(&self, payload: &Map<String, Value>) -> PipedriveResult<u64> {
        self.create("persons", payload).await
    }

    #[instrument(skip_all)]
    pub async fn create_deal(&self, payload: &Map<String, Value>) -> PipedriveResult<u64> {
        self.create("deals", payload).await
    }

    /// Id of the organization with exactly this name, if any.
    pub async fn find_organization_by_name(&self, name: &str) -> PipedriveResult<Option<u64>> {
        self.search("organizations", name).await
    }

    pub async fn find_person_by_name(&self, name: &str) -> PipedriveResult<Option<u64>> {
        self.search("persons", name).await
    }

    pub async fn organization_fields(&self) -> PipedriveResult<Vec<CrmField>> {
        self.fields(EntityKind::Organization).await
    }

    pub async fn person_fields(&self) -> PipedriveResult<Vec<CrmField>> {
        self.fields(EntityKind::Person).await
    }

    pub async fn deal_fields(&self) -> PipedriveResult<Vec<CrmField>> {
        self.fields(EntityKind::Deal).await
    }

    /// Field metadata of `entity`.
    #[instrument(skip(self))]
    pub async fn fields(&self, entity: EntityKind) -> PipedriveResult<Vec<CrmField>> {
        let path = match entity {
            EntityKind::Organization => "organizationFields",
            EntityKind::Person => "personFields",
            EntityKind::Deal => "dealFields",
        };
        let response = self
            .http_client
            .get(self.url(path))
            .query(&[("api_token", self.api_token.expose_secret())])
            .send()
            .await?;

        Ok(unwrap_envelope::<Vec<CrmField>>(response)
            .await?
            .unwrap_or_default())
    }

    async fn create(&self, path: &str, payload: &Map<String, Value>) -> PipedriveResult<u64> {
        let response = self
            .http_client
            .post(self.url(path))
            .query(&[("api_token", self.api_token.expose_secret())])
            .json(payload)
            .send()
            .await?;

        let created: EntityRef = unwrap_envelope(response)
            .await?
            .ok_or_else(|| PipedriveError::UnexpectedResponse(format!("{path}: no data")))?;
        debug!(path, id = created.id, "Created CRM entity");
        Ok(created.id)
    }

    async fn search(&self, path: &str, term: &str) -> PipedriveResult<Option<u64>> {
        let response = self
            .http_client
            .get(self.url(&format!("{path}/search")))
            .query(&[
                ("api_token", self.api_token.expose_secret()),
                ("term", term),
                ("fields", "name"),
                ("exact_match", "true"),
            ])
            .send()
            .await?;

        let result: Option<SearchResult> = unwrap_envelope(response).await?;
        Ok(result
            .and_then(|r| r.items.into_iter().next())
            .map(|found| found.item.id))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

async fn unwrap_envelope<T: DeserializeOwned>(response: Response) -> PipedriveResult<Option<T>> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        return Err(PipedriveError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let envelope: Envelope<T> = response.json().await?;
    if !envelope.success {
        return Err(PipedriveError::Api {
            status: status.as_u16(),
            message: envelope
                .error
                .unwrap_or_else(|| "request was not successful".to_string()),
        });
    }
    Ok(envelope.data)
}
