//! Application configuration loaded from environment variables.
//!
//! Required variables must be present and valid, or the binary exits with a
//! clear error message before binding the listener.

use abasync_core::{AbacusConfig, ConfigError, ConfigResult, TenantCatalog};
use secrecy::SecretString;
use std::env::VarError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_COMPANY: &str = "uniska";
const DEFAULT_MAPPINGS_DIR: &str = "mappings";
const DEFAULT_COOLDOWN_SECS: u64 = 300;
const DEFAULT_LOG_FILTER: &str = "info,abasync=debug";

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" | "text" => Ok(Self::Pretty),
            other => Err(format!("expected json or pretty, got {other}")),
        }
    }
}

#[derive(Debug)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    /// Company key selecting the tenant tables and the mapping files.
    pub company: String,
    pub mappings_dir: PathBuf,
    /// Replaces the built-in tenant tables when set.
    pub tenants_file: Option<PathBuf>,
    pub pipedrive_api_url: String,
    /// CRM endpoints are disabled without a key.
    pub pipedrive_api_key: Option<SecretString>,
    /// Minimum delay between two starts of the same report by one client.
    pub report_cooldown: Duration,
    pub log_filter: String,
    pub log_format: LogFormat,
    pub abacus: AbacusConfig,
}

impl AppConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_reader(|key| std::env::var(key))
    }

    pub fn from_reader<F>(reader: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let abacus = AbacusConfig::from_reader(&reader)?;

        let listen_addr = reader("LISTEN_ADDR")
            .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidValue("LISTEN_ADDR".into(), e.to_string())
            })?;

        let company = reader("COMPANY")
            .map(|c| c.trim().to_lowercase())
            .unwrap_or_else(|_| DEFAULT_COMPANY.to_string());

        let key_var = format!("{}_PIPEDRIVE_API_KEY", company.to_uppercase());
        let pipedrive_api_key = reader(&key_var)
            .or_else(|_| reader("PIPEDRIVE_API_KEY"))
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::from);

        let cooldown_secs = match reader("REPORT_COOLDOWN_SECS") {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("REPORT_COOLDOWN_SECS".into(), e.to_string())
            })?,
            Err(_) => DEFAULT_COOLDOWN_SECS,
        };

        let log_format = match reader("LOG_FORMAT") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| ConfigError::InvalidValue("LOG_FORMAT".into(), e))?,
            Err(_) => LogFormat::Json,
        };

        Ok(Self {
            listen_addr,
            company,
            mappings_dir: reader("MAPPINGS_DIR")
                .unwrap_or_else(|_| DEFAULT_MAPPINGS_DIR.to_string())
                .into(),
            tenants_file: reader("TENANTS_FILE").ok().map(PathBuf::from),
            pipedrive_api_url: reader("PIPEDRIVE_API_URL")
                .unwrap_or_else(|_| abasync_pipedrive::DEFAULT_API_URL.to_string()),
            pipedrive_api_key,
            report_cooldown: Duration::from_secs(cooldown_secs),
            log_filter: reader("LOG_FILTER").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
            log_format,
            abacus,
        })
    }

    /// Tenant tables from `tenants_file`, or the built-in ones.
    pub fn tenant_catalog(&self) -> ConfigResult<TenantCatalog> {
        match &self.tenants_file {
            Some(path) => TenantCatalog::from_file(path),
            None => Ok(TenantCatalog::builtin()),
        }
    }
}
