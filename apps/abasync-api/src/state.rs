//! Shared application state handed to every handler.

use abasync_abacus::ReportManager;
use abasync_core::ReportRegistry;
use abasync_pipedrive::{CrmSync, MappingStore, PipedriveClient};
use abasync_reconcile::{CombineConfig, CombineEngine};
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::StartupError;
use crate::rate_limit::CooldownLimiter;

#[derive(Debug, Clone)]
pub struct AppState {
    pub manager: ReportManager,
    pub combine: Arc<CombineEngine>,
    pub cooldown: Arc<CooldownLimiter>,
    pub mappings: Arc<MappingStore>,
    /// Set only when a Pipedrive API key is configured.
    pub pipedrive: Option<PipedriveClient>,
    /// Built once so every sync request shares the record ledger.
    crm: Option<CrmSync>,
}

impl AppState {
    #[must_use]
    pub fn new(
        manager: ReportManager,
        cooldown: CooldownLimiter,
        mappings: Arc<MappingStore>,
        pipedrive: Option<PipedriveClient>,
    ) -> Self {
        let combine = CombineEngine::new(CombineConfig::default());
        let crm = pipedrive.clone().map(|client| {
            let config = combine.config();
            CrmSync::new(client, Arc::clone(&mappings))
                .with_status(&config.status_field, &config.status_new)
                .with_key_fields(config.record_key_fields())
        });

        Self {
            manager,
            combine: Arc::new(combine),
            cooldown: Arc::new(cooldown),
            mappings,
            pipedrive,
            crm,
        }
    }

    /// Builds the state of the configured company.
    pub fn from_config(config: AppConfig) -> Result<Self, StartupError> {
        let catalog = config.tenant_catalog()?;
        let tenant = Arc::new(catalog.tenant(&config.company)?.clone());
        let request_timeout = config.abacus.request_timeout;

        let manager = ReportManager::new(
            Arc::new(config.abacus),
            Arc::clone(&tenant),
            ReportRegistry::new(),
        )?;
        let mappings = Arc::new(MappingStore::open(&config.mappings_dir, &config.company)?);

        let pipedrive = match &config.pipedrive_api_key {
            Some(key) => Some(PipedriveClient::new(
                config.pipedrive_api_url.as_str(),
                key.expose_secret(),
                request_timeout,
            )?),
            None => {
                warn!(company = %config.company, "No Pipedrive API key configured, CRM endpoints disabled");
                None
            }
        };

        info!(
            company = %config.company,
            tenant = %tenant.name,
            report_kinds = ?tenant.report_kinds(),
            "Application state ready"
        );

        Ok(Self::new(
            manager,
            CooldownLimiter::new(config.report_cooldown),
            mappings,
            pipedrive,
        ))
    }

    /// CRM sync bound to the current mappings, if the CRM is configured.
    #[must_use]
    pub fn crm_sync(&self) -> Option<&CrmSync> {
        self.crm.as_ref()
    }
}
