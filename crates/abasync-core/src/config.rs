//! Bridge configuration.
//!
//! `AbacusConfig` carries the ERP connection settings and is loaded from
//! environment variables. `TenantCatalog` carries the per-company tables
//! (mandants and report kinds); it ships with two built-in companies and
//! can be replaced by a JSON file.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::{ConfigError, ConfigResult};

const DEFAULT_BASE_URL: &str = "https://abacus.indutrade.ch";
const TOKEN_PATH: &str = "/oauth/oauth2/v1/token";
const DEFAULT_PAGE_SIZE: u32 = 1000;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_AUTH_MAX_RETRIES: u32 = 3;

/// Connection settings for the Abacus reporting API.
#[derive(Debug)]
pub struct AbacusConfig {
    /// Base URL of the ERP, without trailing slash.
    pub base_url: String,
    /// OAuth2 client-credentials token endpoint.
    pub token_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Rows per result page requested from the ERP.
    pub page_size: u32,
    /// Fixed delay between two status polls of the same job.
    pub poll_interval: Duration,
    /// Timeout applied to every individual HTTP call.
    pub request_timeout: Duration,
    /// How long a fetched dataset stays in the result cache.
    pub cache_ttl: Duration,
    /// Token requests retried after the first failure before giving up.
    pub auth_max_retries: u32,
    /// First backoff delay between token attempts; doubles after each failure.
    pub auth_backoff_base: Duration,
}

impl AbacusConfig {
    /// Creates a configuration with default timings.
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let token_url = format!("{base_url}{TOKEN_PATH}");
        Self {
            base_url,
            token_url,
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            auth_max_retries: DEFAULT_AUTH_MAX_RETRIES,
            auth_backoff_base: Duration::from_secs(1),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_reader(|key| std::env::var(key))
    }

    /// Load configuration from a custom variable reader.
    ///
    /// This allows tests to supply variables without mutating process-global
    /// environment state.
    pub fn from_reader<F>(reader: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Result<String, std::env::VarError>,
    {
        let base_url = reader("BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let client_id =
            reader("CLIENT_ID").map_err(|_| ConfigError::MissingVar("CLIENT_ID".into()))?;
        let client_secret = reader("CLIENT_SECRET")
            .map_err(|_| ConfigError::MissingVar("CLIENT_SECRET".into()))?;

        let mut config = Self::new(base_url, client_id, client_secret);

        if let Ok(token_url) = reader("TOKEN_URL") {
            config.token_url = token_url;
        }

        let page_size = parse_var(&reader, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(ConfigError::InvalidValue(
                "PAGE_SIZE".into(),
                "must be greater than zero".into(),
            ));
        }
        config.page_size = page_size;

        config.poll_interval = Duration::from_secs(parse_var(
            &reader,
            "POLL_INTERVAL_SECS",
            DEFAULT_POLL_INTERVAL_SECS,
        )?);
        config.request_timeout = Duration::from_secs(parse_var(
            &reader,
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?);
        config.cache_ttl = Duration::from_secs(parse_var(
            &reader,
            "CACHE_TTL_SECS",
            DEFAULT_CACHE_TTL_SECS,
        )?);

        Ok(config)
    }

    #[must_use]
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    #[must_use]
    pub fn with_auth_retry(mut self, max_retries: u32, backoff_base: Duration) -> Self {
        self.auth_max_retries = max_retries;
        self.auth_backoff_base = backoff_base;
        self
    }
}

fn parse_var<F, T>(reader: &F, key: &str, default: T) -> ConfigResult<T>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match reader(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// How one report kind maps onto a remote report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDefinition {
    /// Remote report name, appended to the report-start path.
    pub report_name: String,
    /// Whether the report is restricted to a fiscal year when one is given.
    #[serde(default)]
    pub year_filter: bool,
}

impl ReportDefinition {
    pub fn new(report_name: impl Into<String>) -> Self {
        Self {
            report_name: report_name.into(),
            year_filter: false,
        }
    }

    #[must_use]
    pub fn with_year_filter(mut self) -> Self {
        self.year_filter = true;
        self
    }
}

/// Static tables of one company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    /// Display name of the company.
    pub name: String,
    /// Mandant id to mandant label.
    pub mandants: BTreeMap<String, String>,
    /// Report kind (e.g. `adr`) to remote report definition.
    pub reports: BTreeMap<String, ReportDefinition>,
}

impl TenantConfig {
    /// Label of a mandant. Accepts zero-padded ids (`"02"` finds `"2"`).
    #[must_use]
    pub fn mandant_label(&self, mandant_id: &str) -> Option<&str> {
        let trimmed = mandant_id.trim();
        self.mandants
            .get(trimmed)
            .or_else(|| {
                let unpadded = trimmed.trim_start_matches('0');
                self.mandants.get(unpadded)
            })
            .map(String::as_str)
    }

    #[must_use]
    pub fn report(&self, report_kind: &str) -> Option<&ReportDefinition> {
        self.reports.get(report_kind)
    }

    /// Report kinds in sorted order.
    #[must_use]
    pub fn report_kinds(&self) -> Vec<&str> {
        self.reports.keys().map(String::as_str).collect()
    }
}

/// All configured companies, keyed by company key (e.g. `uniska`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantCatalog {
    tenants: BTreeMap<String, TenantConfig>,
}

impl TenantCatalog {
    /// The two companies the bridge was first deployed for.
    #[must_use]
    pub fn builtin() -> Self {
        let mut tenants = BTreeMap::new();
        tenants.insert(
            "uniska".to_string(),
            builtin_tenant(
                "Uniska AG",
                &[("19", "Uniska Interiors"), ("20", "Uniska AG")],
                "uniska",
            ),
        );
        tenants.insert(
            "novisol".to_string(),
            builtin_tenant(
                "Novisol",
                &[
                    ("2", "Novisol AG, Rheinfelden"),
                    ("7", "Novisol GmbH, Weil am Rhein"),
                ],
                "novisol",
            ),
        );
        Self { tenants }
    }

    /// Parses a catalog from JSON (`{"company": {name, mandants, reports}}`).
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|e| ConfigError::TenantFile {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// Loads a catalog from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::TenantFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::TenantFile {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn tenant(&self, company: &str) -> ConfigResult<&TenantConfig> {
        self.tenants
            .get(company)
            .ok_or_else(|| ConfigError::UnknownTenant(company.to_string()))
    }

    pub fn companies(&self) -> impl Iterator<Item = &str> {
        self.tenants.keys().map(String::as_str)
    }
}

fn builtin_tenant(name: &str, mandants: &[(&str, &str)], prefix: &str) -> TenantConfig {
    let reports = ["adr", "akp", "anr", "npo"]
        .iter()
        .map(|kind| {
            (
                (*kind).to_string(),
                ReportDefinition::new(format!("{prefix}_pipedrive_{kind}")),
            )
        })
        .collect();

    TenantConfig {
        name: name.to_string(),
        mandants: mandants
            .iter()
            .map(|(id, label)| ((*id).to_string(), (*label).to_string()))
            .collect(),
        reports,
    }
}
