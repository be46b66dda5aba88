//! Entry point for starting and querying report jobs.

use abasync_core::{
    AbacusConfig, ReportDataSet, ReportDefinition, ReportHandle, ReportJobRecord, ReportRegistry,
    ReportSummary, TenantConfig,
};
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::client::{fiscal_year, AbacusClient};
use crate::error::{AbacusError, AbacusResult};
use crate::poller::{JobPoller, PollTarget};

/// Starts report jobs for one company and exposes their registry records.
#[derive(Debug, Clone)]
pub struct ReportManager {
    client: AbacusClient,
    poller: JobPoller,
    registry: ReportRegistry,
    tenant: Arc<TenantConfig>,
}

impl ReportManager {
    pub fn new(
        config: Arc<AbacusConfig>,
        tenant: Arc<TenantConfig>,
        registry: ReportRegistry,
    ) -> AbacusResult<Self> {
        let client = AbacusClient::new(config)?;
        Ok(Self::with_client(client, tenant, registry))
    }

    #[must_use]
    pub fn with_client(
        client: AbacusClient,
        tenant: Arc<TenantConfig>,
        registry: ReportRegistry,
    ) -> Self {
        let poller = JobPoller::new(client.clone(), registry.clone());
        Self {
            client,
            poller,
            registry,
            tenant,
        }
    }

    /// Submits a report and spawns its poller.
    ///
    /// Unknown kinds and mandants are rejected before anything is recorded.
    /// Otherwise a `Running` record exists before the ERP is contacted; if the
    /// submission fails the record is marked `FinishedError` and the error is
    /// returned.
    #[instrument(skip(self))]
    pub async fn start_report(
        &self,
        mandant_id: &str,
        report_kind: &str,
        year: &str,
    ) -> AbacusResult<ReportHandle> {
        let report = self
            .tenant
            .report(report_kind)
            .ok_or_else(|| AbacusError::UnknownReportKind(report_kind.to_string()))?;
        if self.tenant.mandant_label(mandant_id).is_none() {
            return Err(AbacusError::UnknownMandant(mandant_id.to_string()));
        }

        let mandant_id = mandant_id.trim();
        let handle = self.registry.create(mandant_id, report_kind).await;

        match self
            .submit(&handle, mandant_id, report, fiscal_year(year))
            .await
        {
            Ok(remote_job_id) => {
                info!(%handle, %remote_job_id, "Report started");
                self.poller.spawn(PollTarget {
                    handle,
                    remote_job_id,
                    report_kind: report_kind.to_string(),
                });
                Ok(handle)
            }
            Err(e) => {
                error!(%handle, error = %e, "Error starting report");
                self.registry.fail(&handle, &e.to_string()).await?;
                Err(e)
            }
        }
    }

    async fn submit(
        &self,
        handle: &ReportHandle,
        mandant_id: &str,
        report: &ReportDefinition,
        fiscal_year: Option<&str>,
    ) -> AbacusResult<String> {
        let remote_job_id = self
            .client
            .submit_report(mandant_id, report, fiscal_year)
            .await?;
        self.registry
            .assign_remote_job(handle, &remote_job_id)
            .await?;
        Ok(remote_job_id)
    }

    pub async fn get_status(&self, handle: &ReportHandle) -> Option<ReportJobRecord> {
        self.registry.get_status(handle).await
    }

    pub async fn get_data(&self, handle: &ReportHandle) -> Option<Arc<ReportDataSet>> {
        self.registry.get_data(handle).await
    }

    pub async fn list_all(&self) -> Vec<ReportSummary> {
        self.registry.list_all().await
    }

    #[must_use]
    pub fn registry(&self) -> &ReportRegistry {
        &self.registry
    }

    #[must_use]
    pub fn tenant(&self) -> &TenantConfig {
        &self.tenant
    }
}
